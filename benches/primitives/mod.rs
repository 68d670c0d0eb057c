//! Benchmarks for the realtime building blocks.

mod routing;
mod sequencer;
mod state;

pub use routing::bench_routing;
pub use sequencer::bench_sequencer;
pub use state::bench_state;
