//! Modulation combination math.

/*
Combining CV With a Base Value
==============================

A modulatable parameter has two sources of truth: the base value the user
dialled in (the knob), and a control voltage arriving on an input channel
(the cable). How the two combine is a property of the parameter, not of the
cable.

Vocabulary
----------

  cv          The incoming control signal, normalised to [0.0, 1.0].
              0.5 is the resting midpoint.

  base        The knob/slider value, in the parameter's own units.

  range       The parameter's valid [min, max] interval.

  span        For additive relative modulation: how far the parameter
              moves for a full 0 → 1 sweep of the cv.

  octaves     For exponential relative modulation: how many doublings a
              full 0 → 1 sweep covers.


Absolute Mode
-------------

The cable owns the parameter. The knob is ignored.

    result = lerp(min, max, clamp01(cv))

    cv = 0.0  →  min
    cv = 0.5  →  halfway
    cv = 1.0  →  max

Good for: step counts, levels, anything the modulation source should set
outright.


Relative Additive Mode
----------------------

The cable nudges the knob. The midpoint is "no change".

    result = clamp(base + (cv - 0.5) × span, min, max)

    Example: base = 0.4, span = 0.5
        cv = 0.0  →  0.4 - 0.25 = 0.15
        cv = 0.5  →  0.4
        cv = 1.0  →  0.4 + 0.25 = 0.65


Relative Exponential Mode
-------------------------

For frequency-like parameters. Pitch perception is logarithmic, so equal cv
steps should give equal musical intervals, not equal Hz.

    result = base × 2^((cv - 0.5) × octaves)

    Example: base = 440 Hz, octaves = 4
        cv = 0.0   →  440 × 2^-2 = 110 Hz
        cv = 0.5   →  440 × 2^0  = 440 Hz   (exact: 2^0 is exactly 1.0)
        cv = 0.75  →  440 × 2^1  = 880 Hz
        cv = 1.0   →  440 × 2^2  = 1760 Hz

The result is clamped to the parameter range like the additive mode.


Unwired Inputs
--------------

If nothing is patched into a parameter's channel, the buffer behind that
channel holds whatever the graph last left there. Callers check the
connection state first and use the base value untouched; none of the
functions below should ever see an unwired buffer.
*/

/// Clamp to the normalised cv range.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Linear interpolation that hits both endpoints exactly.
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from * (1.0 - t) + to * t
}

/// Absolute mode: the cv sets the parameter directly.
#[inline]
pub fn absolute(cv: f32, min: f32, max: f32) -> f32 {
    lerp(min, max, clamp01(cv))
}

/// Relative additive mode: symmetric offset around `base`.
#[inline]
pub fn relative_additive(base: f32, cv: f32, span: f32, min: f32, max: f32) -> f32 {
    (base + (cv - 0.5) * span).clamp(min, max)
}

/// Relative exponential mode: octave offset around `base`.
#[inline]
pub fn relative_exponential(base: f32, cv: f32, octaves: f32, min: f32, max: f32) -> f32 {
    (base * ((cv - 0.5) * octaves).exp2()).clamp(min, max)
}
