//! Module kinds the rack can host.
//!
//! The set is closed: every kind is a variant of [`ModuleKind`], and the
//! render loop dispatches with one `match`. What a kind offers beyond
//! `process` is described by a small [`Capabilities`] record rather than a
//! pile of optional hooks.

pub mod oscillator;
pub mod registry;
pub mod sequencer;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::routing::{CvSource, RoutingTable};
use crate::telemetry::{Telemetry, TelemetryBuilder};
use crate::transport::TransportState;

pub use oscillator::{OscillatorModule, OscillatorParams};
pub use registry::{ModuleDescriptor, ModuleRegistry};
pub use sequencer::SequencerModule;

/// What a module kind can do, for the patch layer and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Output channels the module writes every block.
    pub outputs: usize,
    /// Whether `process` reads the transport.
    pub follows_transport: bool,
    /// Whether the module plays a snapshot published into a `StateSlot`.
    pub loads_state: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Control voltage, nominally `[0, 1]`.
    Cv,
    /// Audio, nominally `[-1, 1]`.
    Audio,
}

/// One connectable pin, as listed by [`ModuleKind::dynamic_pins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinInfo {
    pub name: &'static str,
    pub direction: PinDirection,
    pub kind: PinKind,
    /// Output channel, or the `(bus, channel)` an input reads from.
    pub bus: usize,
    pub channel: usize,
}

/// Everything `process` gets besides the module's own state.
#[derive(Clone, Copy)]
pub struct ProcessCtx<'a> {
    pub transport: &'a TransportState,
    pub inputs: &'a dyn CvSource,
    pub frames: usize,
}

pub enum ModuleKind {
    StepSequencer(SequencerModule),
    Oscillator(OscillatorModule),
}

impl ModuleKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ModuleKind::StepSequencer(_) => SequencerModule::TYPE_NAME,
            ModuleKind::Oscillator(_) => OscillatorModule::TYPE_NAME,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            ModuleKind::StepSequencer(_) => SequencerModule::CAPABILITIES,
            ModuleKind::Oscillator(_) => OscillatorModule::CAPABILITIES,
        }
    }

    /// The module's modulation routes.
    pub fn routes(&self) -> &Arc<RoutingTable> {
        match self {
            ModuleKind::StepSequencer(m) => m.routes(),
            ModuleKind::Oscillator(m) => m.routes(),
        }
    }

    /// Inputs (one per route) followed by outputs. Allocates; non-RT.
    pub fn dynamic_pins(&self) -> Vec<PinInfo> {
        let mut pins: Vec<PinInfo> = self
            .routes()
            .routes()
            .iter()
            .map(|route| PinInfo {
                name: route.param,
                direction: PinDirection::Input,
                kind: PinKind::Cv,
                bus: route.bus,
                channel: route.channel,
            })
            .collect();

        let (names, kind): (&[&'static str], PinKind) = match self {
            ModuleKind::StepSequencer(_) => (&sequencer::OUTPUTS[..], PinKind::Cv),
            ModuleKind::Oscillator(_) => (&oscillator::OUTPUTS[..], PinKind::Audio),
        };
        pins.extend(names.iter().enumerate().map(|(channel, &name)| PinInfo {
            name,
            direction: PinDirection::Output,
            kind,
            bus: 0,
            channel,
        }));
        pins
    }

    /// Index of the output called `name`.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        let names: &[&str] = match self {
            ModuleKind::StepSequencer(_) => &sequencer::OUTPUTS[..],
            ModuleKind::Oscillator(_) => &oscillator::OUTPUTS[..],
        };
        names.iter().position(|n| *n == name)
    }

    /// Pick up new engine settings. Non-RT; resets playback state.
    pub fn prepare(&mut self, config: &EngineConfig) {
        match self {
            ModuleKind::StepSequencer(m) => m.prepare(config),
            ModuleKind::Oscillator(m) => m.prepare(config),
        }
    }

    /// Render `ctx.frames` samples into `outputs`. Realtime-safe.
    #[inline]
    pub fn process(&mut self, ctx: &ProcessCtx<'_>, outputs: &mut [Vec<f32>]) {
        match self {
            ModuleKind::StepSequencer(m) => m.process(ctx, outputs),
            ModuleKind::Oscillator(m) => m.process(ctx, outputs),
        }
    }

    /// Release retired snapshots nobody reads any more. Realtime-safe.
    #[inline]
    pub fn try_reclaim(&self) -> usize {
        match self {
            ModuleKind::StepSequencer(m) => m.steps().try_reclaim().released(),
            ModuleKind::Oscillator(m) => m.wavetable().try_reclaim().released(),
        }
    }

    pub(crate) fn register_telemetry(&mut self, id: &str, builder: &mut TelemetryBuilder) {
        match self {
            ModuleKind::StepSequencer(m) => m.register_telemetry(id, builder),
            ModuleKind::Oscillator(m) => m.register_telemetry(id, builder),
        }
    }

    #[inline]
    pub(crate) fn publish_telemetry(&self, telemetry: &Telemetry) {
        match self {
            ModuleKind::StepSequencer(m) => m.publish_telemetry(telemetry),
            ModuleKind::Oscillator(m) => m.publish_telemetry(telemetry),
        }
    }
}

impl From<SequencerModule> for ModuleKind {
    fn from(module: SequencerModule) -> Self {
        ModuleKind::StepSequencer(module)
    }
}

impl From<OscillatorModule> for ModuleKind {
    fn from(module: OscillatorModule) -> Self {
        ModuleKind::Oscillator(module)
    }
}
