//! Real-world scenario benchmarks.
//!
//! These model the demo patch: a step sequencer driving an oscillator's
//! pitch and level through cables.

mod rack;

pub use rack::bench_rack;
