//! Forward-difference Jacobian estimation.
//!
//! The development curve has no analytic gradient wired in, so the solver
//! estimates `∂f(x_i; p)/∂p_j` with forward differences. The step per parameter
//! follows the usual MINPACK choice `h_j = sqrt(ε) * |p_j|`, falling back to
//! `sqrt(ε)` when `p_j = 0`.

use nalgebra::DMatrix;

/// Finite-difference step for a parameter value.
pub fn fd_step(value: f64) -> f64 {
    let h = f64::EPSILON.sqrt() * value.abs();
    if h > 0.0 { h } else { f64::EPSILON.sqrt() }
}

/// Estimate the Jacobian of `model` at `params` over the abscissae `x`.
///
/// `base` must hold `model(x_i, params)` for every `i`. Returns `None` when any
/// perturbed evaluation is non-finite.
pub fn forward_difference<const P: usize, F>(
    model: F,
    x: &[f64],
    params: &[f64; P],
    base: &[f64],
) -> Option<DMatrix<f64>>
where
    F: Fn(f64, &[f64; P]) -> f64,
{
    let mut jac = DMatrix::<f64>::zeros(x.len(), P);
    for j in 0..P {
        let h = fd_step(params[j]);
        let mut shifted = *params;
        shifted[j] += h;
        // Use the representable step actually taken.
        let h = shifted[j] - params[j];
        if h == 0.0 {
            return None;
        }
        for (i, &xi) in x.iter().enumerate() {
            let d = (model(xi, &shifted) - base[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, j)] = d;
        }
    }
    Some(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_analytic_derivatives_of_quadratic() {
        // f(x; a, b) = a x^2 + b
        let model = |x: f64, p: &[f64; 2]| p[0] * x * x + p[1];
        let x = [0.0, 1.0, 2.0, 3.0];
        let params = [1.5, -2.0];
        let base: Vec<f64> = x.iter().map(|&xi| model(xi, &params)).collect();

        let jac = forward_difference(model, &x, &params, &base).unwrap();
        for (i, &xi) in x.iter().enumerate() {
            assert!((jac[(i, 0)] - xi * xi).abs() < 1e-6);
            assert!((jac[(i, 1)] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_parameter_uses_absolute_step() {
        assert_eq!(fd_step(0.0), f64::EPSILON.sqrt());
        assert!(fd_step(-200.0) > fd_step(2.0));
    }

    #[test]
    fn non_finite_perturbation_is_reported() {
        let model = |x: f64, p: &[f64; 1]| if p[0] > 1.0 { f64::INFINITY } else { x };
        let params = [1.0];
        let base = [1.0];
        assert!(forward_difference(model, &[1.0], &params, &base).is_none());
    }
}
