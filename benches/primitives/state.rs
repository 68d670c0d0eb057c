//! Benchmarks for snapshot reads and reclamation.

use std::hint::black_box;

use criterion::Criterion;
use saavy_core::sequencing::StepTable;
use saavy_core::state::StateSlot;

pub fn bench_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("core/state");

    let slot = StateSlot::with_state(StepTable::new(16));

    // The read every module does once per block
    group.bench_function("load", |b| {
        b.iter(|| {
            let snapshot = slot.load();
            black_box(snapshot.as_deref().map(StepTable::length));
        })
    });

    // Nothing queued: should be a lock attempt and an empty scan
    group.bench_function("try_reclaim_idle", |b| {
        b.iter(|| black_box(slot.try_reclaim()))
    });

    // Publish then reclaim, the steady state when a UI is editing steps
    group.bench_function("publish_reclaim", |b| {
        let mut length = 1;
        b.iter(|| {
            length = length % 16 + 1;
            slot.publish(StepTable::new(16).with_length(length));
            black_box(slot.try_reclaim());
        })
    });

    group.finish();
}
