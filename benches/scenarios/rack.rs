//! Benchmarks for a complete rack render.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_core::module::ModuleRegistry;
use saavy_core::sequencing::{ClockMode, SequencerStep, StepTable};
use saavy_core::transport::TransportState;
use saavy_core::Rack;

use crate::BLOCK_SIZES;

pub fn bench_rack(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/rack");
    let registry = ModuleRegistry::builtin();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // sequencer → oscillator pitch + level, the demo patch
        let (mut rack, handle) = Rack::builder(&registry)
            .module("seq", "step_sequencer")
            .module("osc", "oscillator")
            .connect("seq", "value", "osc", "pitch")
            .connect("seq", "gate", "osc", "level")
            .output("osc", "out")
            .build()
            .expect("valid rack");
        let steps = (0..8)
            .map(|i| SequencerStep::new(i as f32 / 8.0).gate(1.0))
            .collect::<Vec<_>>();
        handle
            .step_table("seq")
            .expect("sequencer")
            .publish(
                StepTable::new(8)
                    .with_steps(steps)
                    .with_clock(ClockMode::FreeRunning { rate_hz: 8.0 }),
            );

        let transport = TransportState::playing(0.0, 120.0);
        group.bench_with_input(BenchmarkId::new("seq_osc", size), &size, |b, _| {
            b.iter(|| {
                rack.process(black_box(&transport), black_box(&mut buffer));
            })
        });

        // Same patch while a step edit lands every block
        group.bench_with_input(BenchmarkId::new("seq_osc_editing", size), &size, |b, _| {
            let mut length = 1;
            b.iter(|| {
                length = length % 8 + 1;
                handle
                    .edit_steps("seq", |table| table.set_length(length))
                    .expect("sequencer");
                rack.process(black_box(&transport), black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
