//! Step sequencing: step tables, clocks, gates and the sequencer itself.

pub mod clock;
pub mod duration;
pub mod gate;
pub mod sequencer;
pub mod step;

pub use clock::StepClock;
pub use duration::Duration;
pub use gate::{GateFade, TriggerPulse};
pub use sequencer::{SequencerFrame, SequencerOutputs, SequencerState, StepSequencer};
pub use step::{ClockMode, SequencerStep, StepTable};
