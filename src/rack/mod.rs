//! The rack: modules rendered in order, cables copying outputs to CV inputs.
//!
//! A [`Rack`] lives on the audio thread and owns every module. Everything
//! the control side may touch (routing flags, step tables, wavetables,
//! knobs, telemetry) is shared through a [`RackHandle`] instead.

mod builder;
mod handle;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::module::{ModuleKind, ModuleRegistry, ProcessCtx};
use crate::routing::{InputBank, RoutingError};
use crate::telemetry::{Telemetry, TelemetryKey};
use crate::transport::TransportState;

pub use builder::RackBuilder;
pub use handle::{ModuleAccess, RackHandle};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RackError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("unknown module type `{0}`")]
    UnknownType(String),
    #[error("module id `{0}` is used twice")]
    DuplicateId(String),
    #[error("no module called `{0}`")]
    UnknownModule(String),
    #[error("module `{module}` has no output `{output}`")]
    UnknownOutput { module: String, output: String },
    #[error("module `{module}` has no modulatable parameter `{param}`")]
    UnknownParam { module: String, param: String },
    #[error("cable from `{from}` to `{to}` runs backwards; modules render in the order they are added")]
    Feedback { from: String, to: String },
    #[error("`{module}.{param}` already has a cable")]
    InputTaken { module: String, param: String },
    #[error("module `{module}` is a {actual}, not a {expected}")]
    WrongKind {
        module: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// A resolved cable: output channel of one module into a CV channel of a
/// later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cable {
    pub from: usize,
    pub output: usize,
    pub to: usize,
    pub bus: usize,
    pub channel: usize,
}

struct RackSlot {
    module: ModuleKind,
    inputs: InputBank,
    outputs: Vec<Vec<f32>>,
}

pub struct Rack {
    config: EngineConfig,
    slots: Vec<RackSlot>,
    cables: Box<[Cable]>,
    audio_out: Option<(usize, usize)>,
    telemetry: Arc<Telemetry>,
    reclaimed_key: TelemetryKey,
    reclaimed: u64,
}

impl Rack {
    pub fn builder(registry: &ModuleRegistry) -> RackBuilder<'_> {
        RackBuilder::new(registry)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    pub fn cables(&self) -> &[Cable] {
        &self.cables
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Module at render position `index`.
    pub fn module(&self, index: usize) -> Option<&ModuleKind> {
        self.slots.get(index).map(|s| &s.module)
    }

    /// Output buffer `output` of module `index`, as of the last block.
    pub fn output(&self, index: usize, output: usize) -> Option<&[f32]> {
        self.slots
            .get(index)?
            .outputs
            .get(output)
            .map(Vec::as_slice)
    }

    /// Render `out.len()` samples of the rack's audio output. Realtime-safe.
    ///
    /// `transport` describes the first sample. Buffers longer than
    /// `max_block_size` are rendered in several blocks with the song
    /// position carried forward. Retired snapshots are reclaimed once at
    /// the end.
    pub fn process(&mut self, transport: &TransportState, out: &mut [f32]) {
        let sample_rate = self.config.sample_rate as f64;
        let mut offset = 0;
        for chunk in out.chunks_mut(self.config.max_block_size) {
            let mut block = *transport;
            if block.is_playing {
                block.song_position_beats = transport.beat_at(offset, sample_rate);
            }
            self.render_block(&block, chunk);
            offset += chunk.len();
        }

        let released: usize = self.slots.iter().map(|s| s.module.try_reclaim()).sum();
        self.reclaimed += released as u64;
        self.telemetry
            .set_live_value(self.reclaimed_key, self.reclaimed as f64);
    }

    fn render_block(&mut self, transport: &TransportState, out: &mut [f32]) {
        let frames = out.len();

        for index in 0..self.slots.len() {
            let (upstream, rest) = self.slots.split_at_mut(index);
            let Some(slot) = rest.first_mut() else {
                break;
            };

            for cable in self.cables.iter().filter(|c| c.to == index) {
                let Some(source) = upstream
                    .get(cable.from)
                    .and_then(|s| s.outputs.get(cable.output))
                else {
                    continue;
                };
                if let Some(dest) = slot.inputs.channel_mut(cable.bus, cable.channel) {
                    dest[..frames].copy_from_slice(&source[..frames]);
                }
            }
            slot.inputs.set_len(frames);

            let ctx = ProcessCtx {
                transport,
                inputs: &slot.inputs,
                frames,
            };
            slot.module.process(&ctx, &mut slot.outputs);
            slot.module.publish_telemetry(&self.telemetry);
        }

        let source = self
            .audio_out
            .and_then(|(module, output)| self.slots.get(module)?.outputs.get(output));
        match source {
            Some(source) => out.copy_from_slice(&source[..frames]),
            None => out.fill(0.0),
        }
    }
}
