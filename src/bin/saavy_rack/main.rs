//! saavy-rack - step sequencer driving a wavetable oscillator
//!
//! Run with: cargo run --bin saavy-rack

mod app;
mod ui;

use app::RackApp;
use saavy_core::dsp::OscillatorWaveform;
use saavy_core::sequencing::{ClockMode, Duration, SequencerStep, StepTable};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // The terminal belongs to the UI; keep the log quiet unless asked
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Value 0.5 is the oscillator's base pitch; each 0.25 is one octave
    let steps = StepTable::new(8)
        .with_steps([
            SequencerStep::new(0.5).gate(1.0).trigger(),
            SequencerStep::new(0.5),
            SequencerStep::new(0.625).gate(1.0).trigger(),
            SequencerStep::new(0.55).gate(1.0),
            SequencerStep::new(0.375).gate(1.0).trigger(),
            SequencerStep::new(0.5),
            SequencerStep::new(0.6).gate(1.0).trigger(),
            SequencerStep::new(0.45).gate(1.0),
        ])
        .with_clock(ClockMode::HostSync {
            division: Duration::EIGHTH,
        });

    RackApp::new()
        .bpm(112.0)
        .pitch(220.0)
        .waveform(OscillatorWaveform::Saw)
        .steps(steps)
        .run()
}
