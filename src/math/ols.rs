//! Linear least squares solver.
//!
//! Every Levenberg–Marquardt step solves a small damped linear problem
//!
//! ```text
//! minimize ‖r - J δ‖² + λ Σ d_j δ_j²
//! ```
//!
//! which we express as one ordinary least-squares problem on the augmented
//! system `[J; sqrt(λ D)] δ = [r; 0]`.
//!
//! Implementation choices:
//! - We solve with SVD so a rank-deficient Jacobian yields a minimum-norm step
//!   instead of a panic. (Nalgebra's `QR::solve` is intended for square
//!   systems and will panic for non-square matrices.)
//! - The parameter dimension is 3, so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped step `[J; sqrt(λ D)] δ = [r; 0]`.
///
/// `scale` holds the diagonal `D` (one entry per column of `jacobian`).
pub fn solve_damped_step(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &[f64],
    damping: f64,
) -> Option<DVector<f64>> {
    let n = jacobian.nrows();
    let p = jacobian.ncols();
    if scale.len() != p || residuals.len() != n {
        return None;
    }

    let mut aug = DMatrix::<f64>::zeros(n + p, p);
    aug.view_mut((0, 0), (n, p)).copy_from(jacobian);
    for (j, d) in scale.iter().enumerate() {
        aug[(n + j, j)] = (damping * d).sqrt();
    }

    let mut rhs = DVector::<f64>::zeros(n + p);
    rhs.rows_mut(0, n).copy_from(residuals);

    solve_least_squares(&aug, &rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damped_step_shrinks_towards_zero() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let r = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let scale = [1.0, 1.0];

        let free = solve_damped_step(&j, &r, &scale, 0.0).unwrap();
        let damped = solve_damped_step(&j, &r, &scale, 100.0).unwrap();
        assert!((free[1] - 3.0).abs() < 1e-9);
        assert!(damped.norm() < free.norm());
    }

    #[test]
    fn rejects_non_finite_input() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, f64::NAN]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
