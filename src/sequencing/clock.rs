/*
Step Clock
==========

Decides, one sample at a time, whether the sequencer moves to its next step.
Two sources:

Free-running:
  A phase accumulator in [0, 1). Each sample adds rate / sample_rate; when
  the phase reaches 1.0 it wraps and the step advances.

      rate = 2 Hz, sample_rate = 48 kHz
      increment = 2 / 48000 = 1/24000
      → the phase reaches 1.0 on the 24000th sample

Host sync:
  No accumulator of our own. The host's song position (in quarter-note beats)
  is scaled by the division's steps-per-beat; every time the scaled position
  crosses an integer, the step advances.

      division = 1/16 → 4 steps per beat
      beat 0.00 → 0.0    beat 0.25 → 1.0 (advance)    beat 0.50 → 2.0 (advance)

Vocabulary:
  - Phase: position within the current step, 0.0 = just entered, → 1.0 = about to leave
  - Division: note length of one step when synced (see Duration)
  - Wrap: the phase passing 1.0, i.e. an advance

Phase is kept in f64. Summing 1/24000 twenty-four thousand times in f32 drifts
by several samples; in f64 the drift is far below PHASE_EPSILON.

Switching between sources mid-stream starts the new source from scratch; the
phase jump that causes is accepted.
*/

/// Tolerance when testing for a wrap or an integer crossing.
pub const PHASE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct StepClock {
    phase: f64,
    last_scaled: Option<f64>,
}

impl StepClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the start of a step.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.last_scaled = None;
    }

    /// Position within the current step, `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Advance the free-running accumulator by one sample.
    ///
    /// Returns `true` on the sample where the phase wraps. At most one
    /// advance per sample, however high the rate.
    #[inline]
    pub fn tick_free(&mut self, rate_hz: f64, sample_rate: f64) -> bool {
        self.last_scaled = None;
        if sample_rate <= 0.0 {
            return false;
        }

        self.phase += rate_hz.max(0.0) / sample_rate;
        let wraps = (self.phase + PHASE_EPSILON).floor();
        if wraps >= 1.0 {
            self.phase = (self.phase - wraps).max(0.0);
            true
        } else {
            false
        }
    }

    /// Follow the host position for one sample.
    ///
    /// Returns `true` when `beats * steps_per_beat` lands in a different
    /// integer cell than the previous sample. The first call after a reset
    /// only records the position.
    #[inline]
    pub fn tick_sync(&mut self, beats: f64, steps_per_beat: f64) -> bool {
        let scaled = beats * steps_per_beat;
        let cell = (scaled + PHASE_EPSILON).floor();
        self.phase = (scaled - cell).max(0.0);

        let crossed = match self.last_scaled {
            Some(previous) => (previous + PHASE_EPSILON).floor() != cell,
            None => false,
        };
        self.last_scaled = Some(scaled);
        crossed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_running_wraps_on_exact_sample() {
        let mut clock = StepClock::new();
        let mut wraps = Vec::new();
        for i in 0..48_000 {
            if clock.tick_free(2.0, 48_000.0) {
                wraps.push(i);
            }
        }
        // Samples are 0-indexed: the 24000th sample is index 23999
        assert_eq!(wraps, vec![23_999, 47_999]);
    }

    #[test]
    fn test_free_running_zero_rate_never_advances() {
        let mut clock = StepClock::new();
        assert!((0..10_000).all(|_| !clock.tick_free(0.0, 48_000.0)));
        assert!((0..100).all(|_| !clock.tick_free(-5.0, 48_000.0)));
        assert_eq!(clock.phase(), 0.0);
    }

    #[test]
    fn test_free_running_rate_above_sample_rate() {
        let mut clock = StepClock::new();
        // One advance per sample at most
        assert!(clock.tick_free(100_000.0, 48_000.0));
        assert!(clock.phase() < 1.0);
    }

    #[test]
    fn test_sync_crossings() {
        let mut clock = StepClock::new();
        let steps_per_beat = 4.0;
        let beats_per_sample = 0.01;

        let mut advances = 0;
        for i in 0..100 {
            if clock.tick_sync(i as f64 * beats_per_sample, steps_per_beat) {
                advances += 1;
            }
        }
        // 0.00 .. 0.99 beats → cells 0..=3, three crossings
        assert_eq!(advances, 3);
    }

    #[test]
    fn test_sync_first_tick_only_records() {
        let mut clock = StepClock::new();
        assert!(!clock.tick_sync(7.5, 4.0));
        assert!(!clock.tick_sync(7.51, 4.0));
        assert!(clock.tick_sync(7.75, 4.0));
    }

    #[test]
    fn test_mode_switch_restarts_sync_tracking() {
        let mut clock = StepClock::new();
        clock.tick_sync(1.0, 4.0);
        clock.tick_free(1.0, 48_000.0);
        // Free-running tick forgot the last host position
        assert!(!clock.tick_sync(3.0, 4.0));
    }
}
