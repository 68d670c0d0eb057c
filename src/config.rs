//! Engine-wide settings fixed at build time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MAX_BLOCK_SIZE;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive and finite, got {0}")]
    SampleRate(f32),
    #[error("block size must be between 1 and {max}, got {got}")]
    BlockSize { got: usize, max: usize },
    #[error("{name} must be positive and finite, got {ms} ms")]
    Duration { name: &'static str, ms: f32 },
}

/// Sample rate, block size and the control-signal timings derived from them.
///
/// ```ignore
/// let config = EngineConfig::default()
///     .sample_rate(44_100.0)
///     .max_block_size(512)
///     .gate_fade_ms(2.0);
/// config.validate()?;
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Largest block `Rack::process` will be asked to render.
    pub max_block_size: usize,
    /// Length of a full gate edge.
    pub gate_fade_ms: f32,
    /// Width of a trigger pulse.
    pub trigger_width_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_block_size: MAX_BLOCK_SIZE,
            gate_fade_ms: 3.0,
            trigger_width_ms: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn gate_fade_ms(mut self, ms: f32) -> Self {
        self.gate_fade_ms = ms;
        self
    }

    pub fn trigger_width_ms(mut self, ms: f32) -> Self {
        self.trigger_width_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 || self.max_block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::BlockSize {
                got: self.max_block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        for (name, ms) in [
            ("gate fade", self.gate_fade_ms),
            ("trigger width", self.trigger_width_ms),
        ] {
            if !(ms.is_finite() && ms > 0.0) {
                return Err(ConfigError::Duration { name, ms });
            }
        }
        Ok(())
    }

    /// Samples in one gate edge, at least 1.
    pub fn gate_fade_samples(&self) -> u32 {
        ms_to_samples(self.gate_fade_ms, self.sample_rate).round().max(1.0) as u32
    }

    /// Samples in one trigger pulse: `ceil(width * sample_rate)`, at least 1.
    pub fn trigger_samples(&self) -> u32 {
        ms_to_samples(self.trigger_width_ms, self.sample_rate).ceil().max(1.0) as u32
    }
}

// Divide last so whole-millisecond widths at common rates stay exact
fn ms_to_samples(ms: f32, sample_rate: f32) -> f64 {
    ms as f64 * sample_rate as f64 / 1000.0
}
