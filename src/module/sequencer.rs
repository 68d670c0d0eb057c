use std::sync::Arc;

use super::{Capabilities, ProcessCtx};
use crate::config::EngineConfig;
use crate::routing::{RoutingError, RoutingTable};
use crate::sequencing::{SequencerOutputs, StepSequencer, StepTable};
use crate::state::StateSlot;
use crate::telemetry::{Telemetry, TelemetryBuilder, TelemetryKey};

/// Output channel names, in channel order.
pub const OUTPUTS: [&str; 3] = ["value", "gate", "trigger"];
pub const VALUE_OUT: usize = 0;
pub const GATE_OUT: usize = 1;
pub const TRIGGER_OUT: usize = 2;

pub const DEFAULT_MAX_STEPS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct SequencerKeys {
    step: TelemetryKey,
    gate: TelemetryKey,
    value: TelemetryKey,
    phase: TelemetryKey,
}

/// A [`StepSequencer`] playing whatever [`StepTable`] is currently
/// published in its slot.
pub struct SequencerModule {
    sequencer: StepSequencer,
    steps: Arc<StateSlot<StepTable>>,
    keys: Option<SequencerKeys>,
}

impl SequencerModule {
    pub const TYPE_NAME: &'static str = "step_sequencer";
    pub const CAPABILITIES: Capabilities = Capabilities {
        outputs: OUTPUTS.len(),
        follows_transport: true,
        loads_state: true,
    };

    /// Starts with an empty `max_steps` table already published.
    pub fn new(config: &EngineConfig, max_steps: usize) -> Result<Self, RoutingError> {
        let sequencer = StepSequencer::new(config, max_steps)?;
        Ok(Self {
            sequencer,
            steps: Arc::new(StateSlot::with_state(StepTable::new(max_steps))),
            keys: None,
        })
    }

    pub fn routes(&self) -> &Arc<RoutingTable> {
        self.sequencer.routing()
    }

    /// Slot the control thread publishes edited tables into.
    pub fn steps(&self) -> &Arc<StateSlot<StepTable>> {
        &self.steps
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn prepare(&mut self, config: &EngineConfig) {
        self.sequencer.prepare(config);
    }

    pub fn process(&mut self, ctx: &ProcessCtx<'_>, outputs: &mut [Vec<f32>]) {
        let [value, gate, trigger, ..] = outputs else {
            return;
        };
        let n = ctx
            .frames
            .min(value.len())
            .min(gate.len())
            .min(trigger.len());
        let table = self.steps.load();
        self.sequencer.advance_planar(
            table.as_deref(),
            ctx.transport,
            ctx.inputs,
            SequencerOutputs {
                value: &mut value[..n],
                gate: &mut gate[..n],
                trigger: &mut trigger[..n],
            },
        );
    }

    pub fn register_telemetry(&mut self, id: &str, builder: &mut TelemetryBuilder) {
        self.keys = Some(SequencerKeys {
            step: builder.register(format!("{id}.step")),
            gate: builder.register(format!("{id}.gate")),
            value: builder.register(format!("{id}.value")),
            phase: builder.register(format!("{id}.phase")),
        });
    }

    pub fn publish_telemetry(&self, telemetry: &Telemetry) {
        if let Some(keys) = self.keys {
            telemetry.set_live_value(keys.step, self.sequencer.current_step() as f64);
            telemetry.set_live_value(keys.gate, self.sequencer.gate_level() as f64);
            telemetry.set_live_value(keys.value, self.sequencer.last_value() as f64);
            telemetry.set_live_value(keys.phase, self.sequencer.phase());
        }
    }
}
