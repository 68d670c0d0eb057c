#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Duration;
use crate::persist::StateTree;

/// One slot of a step sequencer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerStep {
    /// Base value emitted on the value output while this step is current.
    pub value: f32,
    /// Compared against the table's gate threshold.
    pub gate_level: f32,
    /// Fire a one-shot trigger pulse when the step is entered.
    pub trigger: bool,
    /// Replaces the additive span of the `value` route for this step.
    /// `Some(0.0)` pins the step to its base value.
    pub modulation_override: Option<f32>,
}

impl Default for SequencerStep {
    fn default() -> Self {
        Self {
            value: 0.0,
            gate_level: 0.0,
            trigger: false,
            modulation_override: None,
        }
    }
}

impl SequencerStep {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn gate(mut self, level: f32) -> Self {
        self.gate_level = level;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.trigger = true;
        self
    }

    pub fn span(mut self, span: f32) -> Self {
        self.modulation_override = Some(span);
        self
    }
}

/// Where step advances come from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMode {
    /// Internal phase accumulator at `rate_hz` steps per second.
    FreeRunning { rate_hz: f32 },
    /// Locked to the host song position, one step per `division`.
    HostSync { division: Duration },
}

impl Default for ClockMode {
    fn default() -> Self {
        ClockMode::FreeRunning { rate_hz: 2.0 }
    }
}

/// The editable half of a sequencer: steps plus clock and length settings.
///
/// Built and edited on the control thread, then published whole through a
/// [`StateSlot`](crate::state::StateSlot). The number of slots is fixed at
/// construction (`max_steps`); only their contents change.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StepTable {
    steps: Vec<SequencerStep>,
    length: usize,
    clock: ClockMode,
    gate_threshold: f32,
}

impl StepTable {
    pub const DEFAULT_GATE_THRESHOLD: f32 = 0.5;

    /// `max_steps` empty steps, all active. At least one step always exists.
    pub fn new(max_steps: usize) -> Self {
        let max_steps = max_steps.max(1);
        Self {
            steps: vec![SequencerStep::default(); max_steps],
            length: max_steps,
            clock: ClockMode::default(),
            gate_threshold: Self::DEFAULT_GATE_THRESHOLD,
        }
    }

    /// Fill the leading slots from `steps`; extra entries are ignored.
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = SequencerStep>) -> Self {
        for (slot, step) in self.steps.iter_mut().zip(steps) {
            *slot = step;
        }
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.set_length(length);
        self
    }

    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_gate_threshold(mut self, threshold: f32) -> Self {
        self.gate_threshold = threshold;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.steps.len()
    }

    /// User-chosen number of active steps, in `[1, max_steps]`.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn set_length(&mut self, length: usize) {
        self.length = length.clamp(1, self.max_steps());
    }

    pub fn clock(&self) -> ClockMode {
        self.clock
    }

    pub fn set_clock(&mut self, clock: ClockMode) {
        self.clock = clock;
    }

    pub fn gate_threshold(&self) -> f32 {
        self.gate_threshold
    }

    pub fn steps(&self) -> &[SequencerStep] {
        &self.steps
    }

    /// Step at `index`, clamped to the last slot.
    #[inline]
    pub fn step(&self, index: usize) -> SequencerStep {
        let last = self.steps.len() - 1;
        self.steps[index.min(last)]
    }

    /// Overwrite one slot. Returns `false` if `index` is out of range.
    pub fn set_step(&mut self, index: usize, step: SequencerStep) -> bool {
        match self.steps.get_mut(index) {
            Some(slot) => {
                *slot = step;
                true
            }
            None => false,
        }
    }

    pub fn save(&self, tree: &mut dyn StateTree, prefix: &str) {
        tree.set(&format!("{prefix}.length"), self.length as f64);
        tree.set(&format!("{prefix}.gate_threshold"), self.gate_threshold as f64);
        match self.clock {
            ClockMode::FreeRunning { rate_hz } => {
                tree.set(&format!("{prefix}.clock"), 0.0);
                tree.set(&format!("{prefix}.rate"), rate_hz as f64);
            }
            ClockMode::HostSync { division } => {
                tree.set(&format!("{prefix}.clock"), 1.0);
                tree.set(&format!("{prefix}.division.num"), division.numerator as f64);
                tree.set(&format!("{prefix}.division.den"), division.denominator as f64);
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            let key = format!("{prefix}.step{i}");
            tree.set(&format!("{key}.value"), step.value as f64);
            tree.set(&format!("{key}.gate"), step.gate_level as f64);
            tree.set(&format!("{key}.trigger"), if step.trigger { 1.0 } else { 0.0 });
            // NaN marks "no override"; trees cannot delete keys
            tree.set(
                &format!("{key}.span"),
                step.modulation_override.map_or(f64::NAN, f64::from),
            );
        }
    }

    /// Read back what [`save`](Self::save) wrote. Missing keys leave the
    /// current setting alone; slots beyond `max_steps` are ignored.
    pub fn restore(&mut self, tree: &dyn StateTree, prefix: &str) {
        if let Some(threshold) = tree.get(&format!("{prefix}.gate_threshold")) {
            self.gate_threshold = threshold as f32;
        }

        match tree.get(&format!("{prefix}.clock")) {
            Some(flag) if flag >= 0.5 => {
                let num = tree.get(&format!("{prefix}.division.num"));
                let den = tree.get(&format!("{prefix}.division.den"));
                if let (Some(num), Some(den)) = (num, den) {
                    self.clock = ClockMode::HostSync {
                        division: Duration::new(num as u32, den as u32),
                    };
                }
            }
            Some(_) => {
                if let Some(rate) = tree.get(&format!("{prefix}.rate")) {
                    self.clock = ClockMode::FreeRunning {
                        rate_hz: rate as f32,
                    };
                }
            }
            None => {}
        }

        for (i, step) in self.steps.iter_mut().enumerate() {
            let key = format!("{prefix}.step{i}");
            if let Some(value) = tree.get(&format!("{key}.value")) {
                step.value = value as f32;
            }
            if let Some(gate) = tree.get(&format!("{key}.gate")) {
                step.gate_level = gate as f32;
            }
            if let Some(trigger) = tree.get(&format!("{key}.trigger")) {
                step.trigger = trigger >= 0.5;
            }
            if let Some(span) = tree.get(&format!("{key}.span")) {
                step.modulation_override = (!span.is_nan()).then_some(span as f32);
            }
        }

        // After the steps, so a table restored into a smaller one still clamps
        if let Some(length) = tree.get(&format!("{prefix}.length")) {
            self.set_length(length.max(1.0) as usize);
        }
    }
}
