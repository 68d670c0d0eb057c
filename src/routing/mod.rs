//! Modulation routing: which parameters can be driven by audio-rate CV.
//!
//! Every module type declares a fixed [`RoutingTable`] mapping logical
//! parameter ids (`"rate"`, `"pitch"`, …) to a `(bus, channel)` location on
//! its CV input. The patch layer flips per-route connection flags from the
//! control thread; the audio thread snapshots them once per block into a
//! [`ConnectionCache`] and reads CV only for routes that are wired.

/// CV input buffers and the views modules read them through.
pub mod bus;
/// Per-block snapshot of connection and mode flags.
pub mod cache;
/// The fixed route table and its builder.
pub mod table;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::modulate::{absolute, relative_additive, relative_exponential};

pub use bus::{CvBuses, CvSource, InputBank, NoInputs};
pub use cache::{BlockRouting, ConnectionCache, ParamSignal};
pub use table::{RoutingError, RoutingTable, RoutingTableBuilder};

/// Valid interval of a parameter, in the parameter's own units.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    /// Normalised cv range.
    pub const UNIT: ParamRange = ParamRange { min: 0.0, max: 1.0 };
    /// Audible frequency range in Hz.
    pub const AUDIO_HZ: ParamRange = ParamRange {
        min: 20.0,
        max: 20_000.0,
    };

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// How a connected cv combines with the parameter's base value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModMode {
    /// The cv sets the parameter across its whole range.
    Absolute,
    /// The cv offsets the base value; see [`RelativeCurve`].
    Relative,
}

impl ModMode {
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            ModMode::Absolute => 0,
            ModMode::Relative => 1,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        if bits == 0 {
            ModMode::Absolute
        } else {
            ModMode::Relative
        }
    }
}

/// Shape of the relative offset, declared per parameter by the module.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelativeCurve {
    /// `base + (cv - 0.5) * span`
    Additive { span: f32 },
    /// `base * 2^((cv - 0.5) * octaves)`, for frequency-like parameters.
    Exponential { octaves: f32 },
}

/// Fixed mapping from one parameter to one CV input channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationRoute {
    pub param: &'static str,
    pub bus: usize,
    pub channel: usize,
    /// Mode the route starts in; the control thread may switch it later.
    pub mode: ModMode,
    pub curve: RelativeCurve,
    pub range: ParamRange,
}

impl ModulationRoute {
    /// Combine a cv sample with `base` under `mode`.
    #[inline]
    pub fn combine(&self, mode: ModMode, base: f32, cv: f32) -> f32 {
        let ParamRange { min, max } = self.range;
        match mode {
            ModMode::Absolute => absolute(cv, min, max),
            ModMode::Relative => match self.curve {
                RelativeCurve::Additive { span } => relative_additive(base, cv, span, min, max),
                RelativeCurve::Exponential { octaves } => {
                    relative_exponential(base, cv, octaves, min, max)
                }
            },
        }
    }
}

/// Position of a route inside its table.
///
/// Module types build their tables in a fixed order and keep the indices
/// as constants, so the audio thread never looks routes up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteIndex(usize);

impl RouteIndex {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn get(&self) -> usize {
        self.0
    }
}
