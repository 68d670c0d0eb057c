//! Low-level DSP primitives used by the modules.
//!
//! These components are allocation-free and realtime-safe on their render
//! paths, so they can be embedded directly inside module structs.

/// How a CV sample combines with a parameter's base value.
pub mod modulate;
/// Wavetables and the oscillator that plays them.
pub mod oscillator;

pub use oscillator::{OscillatorWaveform, Wavetable, WavetableError, WavetableOscillator};
