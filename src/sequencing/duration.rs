/// Musical note duration represented as a rational fraction of a whole note.
///
/// Used as the step length of a host-synced sequencer: a `SIXTEENTH`
/// division advances four steps per quarter-note beat.
/// All operations preserve exact ratios: no floating point drift.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, etc.)
    pub denominator: u32,
}

impl Duration {
    // Standard note values
    pub const WHOLE: Duration = Duration::new(1, 1);
    pub const HALF: Duration = Duration::new(1, 2);
    pub const QUARTER: Duration = Duration::new(1, 4);
    pub const EIGHTH: Duration = Duration::new(1, 8);
    pub const SIXTEENTH: Duration = Duration::new(1, 16);
    pub const THIRTY_SECOND: Duration = Duration::new(1, 32);

    // Convenience constants for common dotted notes
    pub const DOTTED_QUARTER: Duration = Duration::QUARTER.dotted();
    pub const DOTTED_EIGHTH: Duration = Duration::EIGHTH.dotted();

    // Convenience constants for common triplets
    pub const EIGHTH_TRIPLET: Duration = Duration::EIGHTH.triplet();
    pub const SIXTEENTH_TRIPLET: Duration = Duration::SIXTEENTH.triplet();

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Duration {
            numerator,
            denominator,
        }
    }

    /// Apply a dot: multiply duration by 3/2 (increases by 50%)
    pub const fn dotted(self) -> Self {
        Duration {
            numerator: self.numerator * 3,
            denominator: self.denominator * 2,
        }
    }

    /// Create a triplet: multiply duration by 2/3
    /// (three notes in the time of two)
    pub const fn triplet(self) -> Self {
        Duration {
            numerator: self.numerator * 2,
            denominator: self.denominator * 3,
        }
    }

    /// Reduce the fraction to lowest terms using GCD
    pub const fn reduce(self) -> Self {
        let gcd = const_gcd(self.numerator, self.denominator);
        if gcd == 0 {
            return self;
        }
        Duration {
            numerator: self.numerator / gcd,
            denominator: self.denominator / gcd,
        }
    }

    /// Length in quarter-note beats.
    /// Formula: beats = 4 * numerator / denominator
    pub fn beats(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        4.0 * self.numerator as f64 / self.denominator as f64
    }

    /// How many of these fit in one quarter-note beat.
    ///
    /// This is the `division` a host-synced clock multiplies the song
    /// position by. A zero-length duration yields 0 (the clock never
    /// advances) instead of infinity.
    pub fn per_beat(&self) -> f64 {
        if self.numerator == 0 || self.denominator == 0 {
            return 0.0;
        }
        self.denominator as f64 / (4.0 * self.numerator as f64)
    }
}

/// Compute greatest common divisor (Euclidean algorithm)
/// Used to reduce fractions to lowest terms
const fn const_gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_divisions_per_beat() {
        assert_eq!(Duration::QUARTER.per_beat(), 1.0);
        assert_eq!(Duration::EIGHTH.per_beat(), 2.0);
        assert_eq!(Duration::SIXTEENTH.per_beat(), 4.0);
        assert_eq!(Duration::HALF.per_beat(), 0.5);
        assert_eq!(Duration::WHOLE.per_beat(), 0.25);
    }

    #[test]
    fn test_dotted_and_triplet_beats() {
        // Dotted quarter = 1.5 beats
        assert_eq!(Duration::DOTTED_QUARTER.beats(), 1.5);
        // Eighth triplet = 1/3 beat, so three per beat
        assert!((Duration::EIGHTH_TRIPLET.per_beat() - 3.0).abs() < 1e-12);
        // Sixteenth triplet: six per beat
        assert!((Duration::SIXTEENTH_TRIPLET.per_beat() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_durations() {
        assert_eq!(Duration::new(0, 4).per_beat(), 0.0);
        assert_eq!(Duration::new(1, 0).beats(), 0.0);
        assert_eq!(Duration::new(0, 0).reduce(), Duration::new(0, 0));
    }

    #[test]
    fn test_reduce() {
        // 4/8 should reduce to 1/2
        let d = Duration::new(4, 8).reduce();
        assert_eq!(d, Duration::HALF);

        // Eighth = 1/8, dotted = 3/16, triplet = (3/16)*(2/3) = 6/48 = 1/8
        let weird = Duration::EIGHTH.dotted().triplet().reduce();
        assert_eq!(weird, Duration::EIGHTH);
    }

    #[test]
    fn test_const_evaluation() {
        // Verify that all operations can be evaluated at compile time
        const WEIRD_DURATION: Duration = Duration::QUARTER.dotted().triplet().reduce();
        assert_eq!(WEIRD_DURATION.numerator, 1);
    }
}
