/*
Gates and Triggers
==================

A sequencer drives downstream modules with two kinds of control signal.

Gate: "is the note held?" High for as long as the step says so.

    gate  ──┐          ┌──────────┐
            └──────────┘          └────

  Jumping straight between 0 and 1 clicks when the gate feeds an amplifier,
  so every edge gets a short linear fade (a few milliseconds). If the gate
  flips again while a fade is still running, the new fade starts from
  wherever the level is now, not from 0 or 1.

    target: 1 ──────────┐
            0           └─────────
    level:     ╱‾‾‾‾‾‾‾‾‾╲
            ╱             ╲___

Trigger: "something just started." A fixed-width pulse, ~1 ms, fired when a
step with its trigger flag is entered. Consumers edge-detect it, so the
width only has to survive one block of a slower downstream clock.

    trigger ─┐┌─────────┐┌────────
             └┘         └┘
             ↑ step entered

Vocabulary:
  - Edge: a change of the gate's open/closed state
  - Fade length: samples the gate takes to travel a full 0 → 1 edge
  - Pulse width: samples a trigger stays at 1.0
*/

/// Linear fade between closed (0.0) and open (1.0).
#[derive(Debug, Clone)]
pub struct GateFade {
    level: f32,
    target: f32,
    increment: f32,
    remaining: u32,
    fade_samples: u32,
}

impl GateFade {
    pub fn new(fade_samples: u32) -> Self {
        Self {
            level: 0.0,
            target: 0.0,
            increment: 0.0,
            remaining: 0,
            fade_samples: fade_samples.max(1),
        }
    }

    pub fn set_fade_samples(&mut self, fade_samples: u32) {
        self.fade_samples = fade_samples.max(1);
    }

    /// Request a new state. Only an actual edge restarts the fade.
    #[inline]
    pub fn set_open(&mut self, open: bool) {
        let target = if open { 1.0 } else { 0.0 };
        if target == self.target {
            return;
        }
        self.target = target;
        self.remaining = self.fade_samples;
        self.increment = (target - self.level) / self.fade_samples as f32;
    }

    /// Next output sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.level = self.target;
            } else {
                self.level += self.increment;
            }
        }
        self.level
    }

    /// Drop to 0.0 immediately, no fade.
    pub fn close_now(&mut self) {
        self.level = 0.0;
        self.target = 0.0;
        self.increment = 0.0;
        self.remaining = 0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_open(&self) -> bool {
        self.target > 0.0
    }
}

/// Fixed-width one-shot pulse.
#[derive(Debug, Clone)]
pub struct TriggerPulse {
    width: u32,
    remaining: u32,
}

impl TriggerPulse {
    pub fn new(width: u32) -> Self {
        Self {
            width: width.max(1),
            remaining: 0,
        }
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width.max(1);
    }

    /// Start a pulse on the next output sample. Re-firing restarts it.
    #[inline]
    pub fn fire(&mut self) {
        self.remaining = self.width;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            1.0
        } else {
            0.0
        }
    }

    pub fn clear(&mut self) {
        self.remaining = 0;
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_fades_in_over_fade_length() {
        let mut gate = GateFade::new(4);
        gate.set_open(true);
        let out: Vec<f32> = (0..6).map(|_| gate.next()).collect();
        assert_eq!(out, vec![0.25, 0.5, 0.75, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_gate_retrigger_fades_from_current_level() {
        let mut gate = GateFade::new(4);
        gate.set_open(true);
        gate.next();
        gate.next(); // 0.5

        gate.set_open(false);
        let out: Vec<f32> = (0..4).map(|_| gate.next()).collect();
        assert_eq!(out, vec![0.375, 0.25, 0.125, 0.0]);
    }

    #[test]
    fn test_gate_same_state_does_not_restart() {
        let mut gate = GateFade::new(4);
        gate.set_open(true);
        gate.next();
        gate.set_open(true);
        assert_eq!(gate.next(), 0.5);
    }

    #[test]
    fn test_gate_close_now() {
        let mut gate = GateFade::new(64);
        gate.set_open(true);
        for _ in 0..10 {
            gate.next();
        }
        gate.close_now();
        assert_eq!(gate.next(), 0.0);
        assert!(!gate.is_open());
    }

    #[test]
    fn test_trigger_width() {
        let mut trigger = TriggerPulse::new(48);
        trigger.fire();
        let out: Vec<f32> = (0..50).map(|_| trigger.next()).collect();
        assert!(out[..48].iter().all(|&v| v == 1.0));
        assert_eq!(&out[48..], &[0.0, 0.0]);
    }

    #[test]
    fn test_trigger_refire_restarts() {
        let mut trigger = TriggerPulse::new(3);
        trigger.fire();
        trigger.next();
        trigger.next();
        trigger.fire();
        assert_eq!((0..4).map(|_| trigger.next()).sum::<f32>(), 3.0);
        assert!(!trigger.is_active());
    }

    #[test]
    fn test_trigger_clear() {
        let mut trigger = TriggerPulse::new(48);
        trigger.fire();
        assert!(trigger.is_active());
        trigger.clear();
        assert!(!trigger.is_active());
        assert_eq!(trigger.next(), 0.0);
    }
}
