use std::sync::Arc;

use super::clock::StepClock;
use super::gate::{GateFade, TriggerPulse};
use super::step::{ClockMode, StepTable};
use crate::config::EngineConfig;
use crate::routing::{
    BlockRouting, ConnectionCache, CvSource, ParamRange, RelativeCurve, RouteIndex, RoutingError,
    RoutingTable,
};
use crate::transport::TransportState;

/*
Step Sequencer
==============

Walks through a table of steps, emitting three control signals per sample:

    value   ▁▁▃▃▇▇▅▅   the current step's value (optionally modulated)
    gate    ▁▁████▁▁   open while the step's gate level clears the threshold
    trigger ▁▁▌▁▁▁▁▁   short pulse on entering a step flagged as a trigger

State machine:

        transport plays             clock advance
   Idle ───────────────→ Advancing ──────────────┐
    ↑                        │   ↑               │
    └────────────────────────┘   └───────────────┘
        transport stops

  - Idle: playhead parked on step 0, gate closed, nothing pending.
  - Entering Advancing emits step 0 on the very first sample.
  - Each clock advance moves to (current + 1) mod active_steps.
  - Stopping closes the gate immediately (no fade) and parks on step 0.

Modulatable parameters:

  rate   CV bus 0, ch 0   relative, exponential ±2 octaves   free-running speed
  steps  CV bus 0, ch 1   absolute over [1, max_steps]       active step count
  value  CV bus 0, ch 2   relative, additive                 added to step values

The active step count is always clamped to [1, min(max_steps, length)], so
CV can shorten the loop but never run it past the length the user chose.

Vocabulary:
  - Active steps: how many steps the loop cycles through right now
  - Length: the user's upper bound on active steps (StepTable::length)
  - Span override: a per-step replacement for the value route's span;
    Some(0.0) locks the step to its stored value
*/

pub const RATE: RouteIndex = RouteIndex::new(0);
pub const STEPS: RouteIndex = RouteIndex::new(1);
pub const VALUE: RouteIndex = RouteIndex::new(2);

/// Free-running clock rate in steps per second.
pub const RATE_RANGE: ParamRange = ParamRange::new(0.01, 50.0);
pub const RATE_OCTAVES: f32 = 4.0;
pub const VALUE_RANGE: ParamRange = ParamRange::UNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Advancing,
}

/// One sample of sequencer output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SequencerFrame {
    pub value: f32,
    pub gate: f32,
    pub trigger: f32,
}

/// Planar output buffers. Only the shortest length is written.
pub struct SequencerOutputs<'a> {
    pub value: &'a mut [f32],
    pub gate: &'a mut [f32],
    pub trigger: &'a mut [f32],
}

impl SequencerOutputs<'_> {
    fn len(&self) -> usize {
        self.value.len().min(self.gate.len()).min(self.trigger.len())
    }
}

pub struct StepSequencer {
    table: Arc<RoutingTable>,
    cache: ConnectionCache,
    clock: StepClock,
    gate: GateFade,
    trigger: TriggerPulse,
    state: SequencerState,
    current: usize,
    active_steps: usize,
    last_value: f32,
    sample_rate: f64,
}

impl StepSequencer {
    /// The three routes every sequencer exposes, sized for `max_steps`.
    pub fn routing_table(max_steps: usize) -> Result<RoutingTable, RoutingError> {
        RoutingTable::builder()
            .relative(
                "rate",
                0,
                0,
                RelativeCurve::Exponential {
                    octaves: RATE_OCTAVES,
                },
                RATE_RANGE,
            )
            .absolute("steps", 0, 1, ParamRange::new(1.0, max_steps.max(1) as f32))
            .relative(
                "value",
                0,
                2,
                RelativeCurve::Additive { span: 1.0 },
                VALUE_RANGE,
            )
            .build()
    }

    /// Allocates. Build on the control thread, then move to the audio thread.
    pub fn new(config: &EngineConfig, max_steps: usize) -> Result<Self, RoutingError> {
        let table = Arc::new(Self::routing_table(max_steps)?);
        let cache = ConnectionCache::new(&table);
        Ok(Self {
            table,
            cache,
            clock: StepClock::new(),
            gate: GateFade::new(config.gate_fade_samples()),
            trigger: TriggerPulse::new(config.trigger_samples()),
            state: SequencerState::Idle,
            current: 0,
            active_steps: max_steps.max(1),
            last_value: 0.0,
            sample_rate: config.sample_rate as f64,
        })
    }

    /// Shared with the patch layer, which flips connection and mode flags.
    pub fn routing(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Pick up a new sample rate or fade/trigger timing. Resets playback.
    pub fn prepare(&mut self, config: &EngineConfig) {
        self.sample_rate = config.sample_rate as f64;
        self.gate.set_fade_samples(config.gate_fade_samples());
        self.trigger.set_width(config.trigger_samples());
        self.reset();
    }

    /// Back to `Idle`: step 0, gate closed, no pending pulse.
    pub fn reset(&mut self) {
        self.state = SequencerState::Idle;
        self.current = 0;
        self.clock.reset();
        self.gate.close_now();
        self.trigger.clear();
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn active_steps(&self) -> usize {
        self.active_steps
    }

    pub fn phase(&self) -> f64 {
        self.clock.phase()
    }

    pub fn gate_level(&self) -> f32 {
        self.gate.level()
    }

    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    /// Render `out.len()` frames. Realtime-safe.
    ///
    /// `steps` is `None` when no table has been published yet; the
    /// sequencer then behaves as if the transport were stopped.
    pub fn advance(
        &mut self,
        steps: Option<&StepTable>,
        transport: &TransportState,
        inputs: &dyn CvSource,
        out: &mut [SequencerFrame],
    ) {
        let len = out.len();
        self.run(steps, transport, inputs, len, |i, frame| out[i] = frame);
    }

    /// Same as [`advance`](Self::advance), into three separate buffers.
    pub fn advance_planar(
        &mut self,
        steps: Option<&StepTable>,
        transport: &TransportState,
        inputs: &dyn CvSource,
        out: SequencerOutputs<'_>,
    ) {
        let len = out.len();
        let SequencerOutputs {
            value,
            gate,
            trigger,
        } = out;
        self.run(steps, transport, inputs, len, |i, frame| {
            value[i] = frame.value;
            gate[i] = frame.gate;
            trigger[i] = frame.trigger;
        });
    }

    fn run(
        &mut self,
        steps: Option<&StepTable>,
        transport: &TransportState,
        inputs: &dyn CvSource,
        len: usize,
        mut emit: impl FnMut(usize, SequencerFrame),
    ) {
        let steps = match steps {
            Some(steps) if transport.is_playing => steps,
            _ => {
                if self.state == SequencerState::Advancing {
                    self.reset();
                }
                let value = steps.map_or(0.0, |s| s.step(0).value);
                self.last_value = value;
                for i in 0..len {
                    emit(
                        i,
                        SequencerFrame {
                            value,
                            gate: 0.0,
                            trigger: 0.0,
                        },
                    );
                }
                return;
            }
        };

        self.cache.refresh(&self.table);
        let routing = BlockRouting::new(&self.table, &self.cache, inputs);
        let rate = routing.signal(RATE);
        let step_count = routing.signal(STEPS);
        let value_cv = routing.signal(VALUE);

        let mut entering = self.state == SequencerState::Idle;
        if entering {
            self.state = SequencerState::Advancing;
            self.current = 0;
            self.clock.reset();
        }

        let bound = steps.length().min(steps.max_steps()).max(1);
        let threshold = steps.gate_threshold();
        let clock_mode = steps.clock();
        let sample_rate = self.sample_rate;

        for i in 0..len {
            let active = (step_count.at(bound as f32, i).round() as usize).clamp(1, bound);
            self.active_steps = active;

            let advanced = match clock_mode {
                ClockMode::FreeRunning { rate_hz } => {
                    let hz = rate.at(RATE_RANGE.clamp(rate_hz), i);
                    self.clock.tick_free(hz as f64, sample_rate)
                }
                ClockMode::HostSync { division } => self
                    .clock
                    .tick_sync(transport.beat_at(i, sample_rate), division.per_beat()),
            };

            if entering || advanced {
                if !entering {
                    let next = self.current + 1;
                    self.current = if next >= active { 0 } else { next };
                }
                entering = false;
                if steps.step(self.current).trigger {
                    self.trigger.fire();
                }
            }

            let step = steps.step(self.current);
            self.gate.set_open(step.gate_level >= threshold);
            let value = match step.modulation_override {
                Some(span) => value_cv.at_with_span(step.value, i, span),
                None => value_cv.at(step.value, i),
            };
            self.last_value = value;

            emit(
                i,
                SequencerFrame {
                    value,
                    gate: self.gate.next(),
                    trigger: self.trigger.next(),
                },
            );
        }
    }
}
