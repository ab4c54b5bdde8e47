//! Shape kernel for the development curve.
//!
//! The development curve is `A * g(t; B, C)` with the kernel
//!
//! - `g(t; B, C) = s^B * exp(-C s)`, where `s = max(t, 0.1)`
//!
//! Numerical notes:
//! - The base `s` is always `>= 0.1`, so `s^B` is defined for every real `B`
//!   (including negative exponents) and `t <= 0` never hits a domain error.
//! - We evaluate in log space, `exp(B ln s - C s)`, so that large opposing
//!   factors (huge `s^B`, tiny `exp(-C s)`) do not overflow before cancelling.

/// Lower bound applied to `t` before evaluating the kernel.
pub const T_FLOOR: f64 = 0.1;

/// Apply the `t` floor.
pub fn floored(t: f64) -> f64 {
    if t.is_nan() { T_FLOOR } else { t.max(T_FLOOR) }
}

/// Evaluate `g(t; B, C)`.
pub fn kernel(t: f64, b: f64, c: f64) -> f64 {
    let s = floored(t);
    (b * s.ln() - c * s).exp()
}
