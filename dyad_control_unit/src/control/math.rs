//! Circular-position arithmetic primitives.

/// Positive modulo: the representative of `x (mod y)` in `[0, y)`.
///
/// `y` must be strictly positive. Note the usual floating-point caveat:
/// for `x` a tiny negative number the result can round to exactly `y`;
/// index math downstream must tolerate that one-ulp case.
#[inline]
pub fn fmod_pos(x: f32, y: f32) -> f32 {
    x.rem_euclid(y)
}

/// Signed wrap: the representative of `x (mod y)` in `[-y/2, y/2)`.
///
/// This is the shortest-arc signed error used by the circular position
/// loop: `wrap_pm(setpoint - estimate, range)`.
#[inline]
pub fn wrap_pm(x: f32, y: f32) -> f32 {
    fmod_pos(x + 0.5 * y, y) - 0.5 * y
}
