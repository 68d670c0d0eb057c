//! Benchmarks for per-sample parameter evaluation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_core::routing::{
    BlockRouting, ConnectionCache, CvBuses, ModMode, ParamRange, RelativeCurve, RouteIndex,
    RoutingTable,
};

use crate::BLOCK_SIZES;

const PITCH: RouteIndex = RouteIndex::new(0);
const LEVEL: RouteIndex = RouteIndex::new(1);

fn table() -> RoutingTable {
    RoutingTable::builder()
        .relative(
            "pitch",
            0,
            0,
            RelativeCurve::Exponential { octaves: 4.0 },
            ParamRange::AUDIO_HZ,
        )
        .absolute("level", 0, 1, ParamRange::UNIT)
        .build()
        .expect("valid table")
}

pub fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("core/routing");
    let table = table();

    for &size in BLOCK_SIZES {
        let pitch_cv: Vec<f32> = (0..size).map(|i| (i as f32 / size as f32) * 2.0 - 1.0).collect();
        let level_cv = vec![0.5f32; size];
        let channels: [&[f32]; 2] = [&pitch_cv, &level_cv];
        let buses: [&[&[f32]]; 1] = [&channels];
        let inputs = CvBuses::new(&buses);

        // Nothing wired: the base passes straight through
        table.set_connected("pitch", false);
        table.set_connected("level", false);
        let cache = ConnectionCache::new(&table);
        group.bench_with_input(BenchmarkId::new("unconnected", size), &size, |b, &n| {
            let routing = BlockRouting::new(&table, &cache, &inputs);
            b.iter(|| {
                let pitch = routing.signal(PITCH);
                let mut acc = 0.0;
                for i in 0..n {
                    acc += pitch.at(black_box(220.0), i);
                }
                black_box(acc)
            })
        });

        // Exponential pitch, absolute level
        table.set_connected("pitch", true);
        table.set_connected("level", true);
        let cache = ConnectionCache::new(&table);
        group.bench_with_input(BenchmarkId::new("relative_exp", size), &size, |b, &n| {
            let routing = BlockRouting::new(&table, &cache, &inputs);
            b.iter(|| {
                let pitch = routing.signal(PITCH);
                let level = routing.signal(LEVEL);
                let mut acc = 0.0;
                for i in 0..n {
                    acc += pitch.at(black_box(220.0), i) * level.at(black_box(0.5), i);
                }
                black_box(acc)
            })
        });

        table.set_mode("pitch", ModMode::Absolute);
        let cache = ConnectionCache::new(&table);
        group.bench_with_input(BenchmarkId::new("absolute", size), &size, |b, &n| {
            let routing = BlockRouting::new(&table, &cache, &inputs);
            b.iter(|| {
                let pitch = routing.signal(PITCH);
                let mut acc = 0.0;
                for i in 0..n {
                    acc += pitch.at(black_box(220.0), i);
                }
                black_box(acc)
            })
        });
        table.set_mode("pitch", ModMode::Relative);
    }

    group.finish();
}
