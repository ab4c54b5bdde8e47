//! Development curve evaluation.
//!
//! The fitter works on raw parameter vectors `[A, B, C]`; everything else
//! (residuals, overlays, exports) goes through `FittedParameters`.

use crate::domain::FittedParameters;
use crate::math::kernel;

/// Number of curve parameters.
pub const PARAM_COUNT: usize = 3;

/// `f(t; A, B, C) = A * max(t, 0.1)^B * exp(-C * max(t, 0.1))`.
pub fn curve_value(t: f64, params: &[f64; PARAM_COUNT]) -> f64 {
    params[0] * kernel(t, params[1], params[2])
}

/// Predict ACPH at development year `t`.
pub fn predict(params: &FittedParameters, t: f64) -> f64 {
    curve_value(t, &[params.a, params.b, params.c])
}

/// Sample the fitted curve on `n` evenly spaced points over `[t0, t1]`.
pub fn sample_curve(params: &FittedParameters, t0: f64, t1: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let t = t0 + u * (t1 - t0);
            (t, predict(params, t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_point_matches_closed_form() {
        let p = FittedParameters { a: 100.0, b: 2.0, c: 0.5 };
        let expected = 100.0 * 0.1_f64.powf(2.0) * (-0.1_f64 * 0.5).exp();
        assert!((predict(&p, 0.0) - expected).abs() < 1e-12);
        assert!((predict(&p, -3.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn sample_curve_spans_range() {
        let p = FittedParameters { a: 50.0, b: 1.5, c: 0.8 };
        let grid = sample_curve(&p, 0.0, 10.0, 101);
        assert_eq!(grid.len(), 101);
        assert_eq!(grid[0].0, 0.0);
        assert!((grid[100].0 - 10.0).abs() < 1e-12);
        assert!(grid.iter().all(|(_, y)| y.is_finite()));
    }
}
