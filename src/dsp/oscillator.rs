//! Wavetable oscillator.

/*
Wavetables
==========

Computing sin() or a band-limited saw for every output sample is wasteful when
the waveform never changes. Instead, one cycle is rendered into a table ahead
of time, and the oscillator just reads it back at the right speed.

    table (8 points shown, real tables are 2048):

     1.0 │    ●
         │  ●   ●
     0.0 ●─────────●─────────  → phase 0.0 … 1.0
         │           ●   ●
    -1.0 │             ●

Reading between points:
  A phase rarely lands exactly on a table index. Linear interpolation blends
  the two neighbours:

      position = phase × len
      i        = floor(position)
      frac     = position - i
      sample   = table[i] × (1 - frac) + table[(i + 1) mod len] × frac

  The "mod len" wraps the last point back to the first, so the cycle joins
  up with no seam.

Vocabulary:
  - Phase: position in the cycle, 0.0 to 1.0
  - Phase increment: frequency / sample_rate, the distance travelled per sample
  - Table size: number of stored points in one cycle

Building a table allocates and can be slow, so tables are built on a loader
thread and published to the audio thread as an immutable snapshot. The
oscillator itself only holds its phase.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsp::modulate::lerp;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorWaveform {
    Sine,
    Saw,
    Square,
    Triangle,
    Noise,
}

impl OscillatorWaveform {
    pub const ALL: [OscillatorWaveform; 5] = [
        OscillatorWaveform::Sine,
        OscillatorWaveform::Saw,
        OscillatorWaveform::Square,
        OscillatorWaveform::Triangle,
        OscillatorWaveform::Noise,
    ];

    /// The next shape in [`ALL`](Self::ALL), wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|w| *w == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Value of one cycle at `phase` in `[0, 1)`. Noise has no shape of its
    /// own and is filled in by [`Wavetable::new`].
    fn shape(self, phase: f32) -> f32 {
        match self {
            OscillatorWaveform::Sine => (phase * std::f32::consts::TAU).sin(),
            OscillatorWaveform::Saw => 2.0 * phase - 1.0,
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            OscillatorWaveform::Noise => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WavetableError {
    #[error("wavetable needs at least 2 samples, got {0}")]
    TooShort(usize),
    #[error("wavetable sample {index} is not finite")]
    NonFinite { index: usize },
}

/// One cycle of a waveform, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavetable {
    samples: Box<[f32]>,
    waveform: Option<OscillatorWaveform>,
}

impl Wavetable {
    pub const DEFAULT_SIZE: usize = 2048;

    /// Render `waveform` into a table of `size` points (at least 2).
    pub fn new(waveform: OscillatorWaveform, size: usize) -> Self {
        let size = size.max(2);
        let samples = match waveform {
            OscillatorWaveform::Noise => {
                // xorshift32, fixed seed: the same table every build
                let mut state: u32 = 0x9E37_79B9;
                (0..size)
                    .map(|_| {
                        state ^= state << 13;
                        state ^= state >> 17;
                        state ^= state << 5;
                        (state as f32 / u32::MAX as f32) * 2.0 - 1.0
                    })
                    .collect()
            }
            shape => (0..size)
                .map(|i| shape.shape(i as f32 / size as f32))
                .collect(),
        };

        Self {
            samples,
            waveform: Some(waveform),
        }
    }

    /// Use caller-supplied points as one cycle.
    pub fn from_samples(samples: Vec<f32>) -> Result<Self, WavetableError> {
        if samples.len() < 2 {
            return Err(WavetableError::TooShort(samples.len()));
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(WavetableError::NonFinite { index });
        }
        Ok(Self {
            samples: samples.into_boxed_slice(),
            waveform: None,
        })
    }

    /// `None` for tables built from raw samples.
    pub fn waveform(&self) -> Option<OscillatorWaveform> {
        self.waveform
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Interpolated read. `phase` wraps, so any finite value is accepted.
    #[inline]
    pub fn sample_at(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        let position = phase.rem_euclid(1.0) * len as f32;
        let index = (position as usize).min(len - 1);
        let frac = position - index as f32;
        let a = self.samples[index];
        let b = self.samples[(index + 1) % len];
        lerp(a, b, frac)
    }
}

impl Default for Wavetable {
    fn default() -> Self {
        Self::new(OscillatorWaveform::Sine, Self::DEFAULT_SIZE)
    }
}

/// Phase accumulator that plays a [`Wavetable`].
#[derive(Debug, Clone)]
pub struct WavetableOscillator {
    phase: f64,
    sample_rate: f64,
}

impl WavetableOscillator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate: sample_rate as f64,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate as f64;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Output the current sample of `table`, then move on by one sample at
    /// `frequency_hz`. Negative frequencies are treated as 0.
    #[inline]
    pub fn next(&mut self, table: &Wavetable, frequency_hz: f32) -> f32 {
        let out = table.sample_at(self.phase as f32);
        if self.sample_rate > 0.0 {
            self.phase = (self.phase + frequency_hz.max(0.0) as f64 / self.sample_rate).fract();
        }
        out
    }
}
