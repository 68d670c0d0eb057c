//! Benchmarks for the step sequencer state machine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_core::routing::NoInputs;
use saavy_core::sequencing::{
    ClockMode, Duration, SequencerFrame, SequencerStep, StepSequencer, StepTable,
};
use saavy_core::transport::TransportState;
use saavy_core::EngineConfig;

use crate::BLOCK_SIZES;

fn steps(clock: ClockMode) -> StepTable {
    let steps = (0..16)
        .map(|i| {
            let step = SequencerStep::new(i as f32 / 16.0);
            if i % 2 == 0 {
                step.gate(1.0).trigger()
            } else {
                step
            }
        })
        .collect::<Vec<_>>();
    StepTable::new(16).with_steps(steps).with_clock(clock)
}

pub fn bench_sequencer(c: &mut Criterion) {
    let mut group = c.benchmark_group("core/sequencer");
    let config = EngineConfig::default();

    for &size in BLOCK_SIZES {
        let mut frames = vec![SequencerFrame::default(); size];

        // Fast free clock so steps change inside every block
        let table = steps(ClockMode::FreeRunning { rate_hz: 40.0 });
        let transport = TransportState::playing(0.0, 120.0);
        let mut seq = StepSequencer::new(&config, 16).expect("valid sequencer");
        group.bench_with_input(BenchmarkId::new("free_running", size), &size, |b, _| {
            b.iter(|| {
                seq.advance(Some(&table), black_box(&transport), &NoInputs, &mut frames);
            })
        });

        // Host sync: the transport position moves forward each block
        let table = steps(ClockMode::HostSync {
            division: Duration::SIXTEENTH,
        });
        let mut seq = StepSequencer::new(&config, 16).expect("valid sequencer");
        let beats_per_block = size as f64 * TransportState::playing(0.0, 120.0).beats_per_sample(48_000.0);
        let mut position = 0.0;
        group.bench_with_input(BenchmarkId::new("host_sync", size), &size, |b, _| {
            b.iter(|| {
                let transport = TransportState::playing(position, 120.0);
                seq.advance(Some(&table), black_box(&transport), &NoInputs, &mut frames);
                position += beats_per_block;
            })
        });
    }

    group.finish();
}
