//! Nonlinear least squares (Levenberg–Marquardt) with a finite-difference
//! Jacobian.
//!
//! Given:
//! - abscissae `x_i`
//! - observed values `y_i`
//! - a model `f(x; p)` with `P` parameters and a starting point `p0`
//!
//! we minimise `Σ (y_i - f(x_i; p))²`:
//!
//! - estimate `J = ∂f/∂p` by forward differences (P extra evaluations)
//! - solve the damped step `[J; sqrt(λD)] δ = [r; 0]` with `D = diag(JᵀJ)`
//! - cap the scaled step `‖Dδ‖` at a trust radius, MINPACK style: the radius
//!   starts at `100 · ‖Dp₀‖`, shrinks when a step is rejected or predicts
//!   poorly, and grows when the linear model predicts well
//! - accept the step if the SSE drops (and relax `λ`), otherwise raise `λ`
//!
//! `D` is the running maximum of the Jacobian column norms, so a column that
//! collapses (e.g. the kernel underflowing to 0) cannot make steps along it free.
//!
//! Convergence follows the MINPACK conventions used by most curve-fitting
//! front-ends: relative SSE reduction below `ftol`, or a step smaller than
//! `xtol` relative to the parameter norm. A Jacobian that vanishes entirely is
//! a stall, not convergence.

use nalgebra::DVector;

use crate::math::{forward_difference, solve_damped_step};

/// Upper bound on the damping factor before the solver gives up.
const MAX_DAMPING: f64 = 1e16;
/// Lower bound on the damping factor after repeated successful steps.
const MIN_DAMPING: f64 = 1e-15;
/// Floor for the Marquardt scaling diagonal (zero Jacobian columns).
const MIN_SCALE: f64 = 1e-12;
/// Initial trust radius as a multiple of `‖Dp₀‖`.
const STEP_BOUND_FACTOR: f64 = 100.0;

/// Solver tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Cap on model evaluations (objective + Jacobian columns).
    pub max_evaluations: usize,
    /// Relative SSE reduction below which we declare convergence.
    pub ftol: f64,
    /// Relative step size below which we declare convergence.
    pub xtol: f64,
    /// Starting damping factor `λ`.
    pub initial_damping: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 5000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            initial_damping: 1e-3,
        }
    }
}

/// A converged solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverReport<const P: usize> {
    pub params: [f64; P],
    pub sse: f64,
    pub evaluations: usize,
    pub iterations: usize,
}

/// Why a fit attempt produced no parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FitFailure {
    /// Input arrays were empty or of different lengths.
    BadInput(String),
    /// The model produced NaN/∞ at the starting point or in the Jacobian.
    NonFiniteResiduals,
    /// The damped step could not be solved.
    SingularSystem,
    /// The evaluation cap was reached before convergence.
    EvaluationLimit { evaluations: usize },
    /// No step reduced the SSE, even with maximal damping, or the model lost
    /// all sensitivity to its parameters.
    Stalled,
    /// The solver converged to parameters outside the admissible region.
    InvalidParameters { a: f64, c: f64 },
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitFailure::BadInput(msg) => write!(f, "bad input: {msg}"),
            FitFailure::NonFiniteResiduals => write!(f, "non-finite model values"),
            FitFailure::SingularSystem => write!(f, "singular least-squares system"),
            FitFailure::EvaluationLimit { evaluations } => {
                write!(f, "no convergence within {evaluations} evaluations")
            }
            FitFailure::Stalled => write!(f, "solver stalled (no improving step)"),
            FitFailure::InvalidParameters { a, c } => {
                write!(f, "converged to inadmissible parameters (A={a:.6}, C={c:.6})")
            }
        }
    }
}

/// Minimise the sum of squared residuals of `model` over `(x, y)`.
pub fn least_squares<const P: usize, F>(
    model: F,
    x: &[f64],
    y: &[f64],
    initial: [f64; P],
    opts: &SolverOptions,
) -> Result<SolverReport<P>, FitFailure>
where
    F: Fn(f64, &[f64; P]) -> f64,
{
    if x.is_empty() || x.len() != y.len() {
        return Err(FitFailure::BadInput(format!(
            "x has {} values, y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(FitFailure::BadInput("non-finite observation".to_string()));
    }

    let mut params = initial;
    let mut evaluations = 0usize;

    let Some(mut fitted) = evaluate(&model, x, &params, &mut evaluations) else {
        return Err(FitFailure::NonFiniteResiduals);
    };
    let mut residuals = residual_vector(y, &fitted);
    let mut sse = residuals.norm_squared();
    let mut damping = opts.initial_damping.max(MIN_DAMPING);
    let mut diag = [0.0_f64; P];
    let mut radius: Option<f64> = None;
    let mut iterations = 0usize;

    loop {
        if sse == 0.0 {
            return Ok(SolverReport { params, sse, evaluations, iterations });
        }
        if evaluations >= opts.max_evaluations {
            return Err(FitFailure::EvaluationLimit { evaluations });
        }

        let jac = forward_difference(&model, x, &params, &fitted).ok_or(FitFailure::NonFiniteResiduals)?;
        evaluations += P;
        iterations += 1;

        let columns: Vec<f64> = (0..P).map(|j| jac.column(j).norm_squared()).collect();
        if columns.iter().all(|&c| c < MIN_SCALE) {
            return Err(FitFailure::Stalled);
        }
        for (d, &c) in diag.iter_mut().zip(columns.iter()) {
            *d = d.max(c).max(MIN_SCALE);
        }

        let mut bound = radius.unwrap_or_else(|| {
            let scaled = scaled_norm(&diag, params.iter().copied());
            if scaled > 0.0 { STEP_BOUND_FACTOR * scaled } else { STEP_BOUND_FACTOR }
        });
        let p_norm = params.iter().map(|v| v * v).sum::<f64>().sqrt();

        // Inner loop: raise damping until a step improves the SSE.
        loop {
            let mut delta = solve_damped_step(&jac, &residuals, &diag, damping).ok_or(FitFailure::SingularSystem)?;
            let mut step_norm = scaled_norm(&diag, delta.iter().copied());
            if step_norm > bound {
                delta *= bound / step_norm;
                step_norm = bound;
            }
            let small_step = delta.norm() <= opts.xtol * (p_norm + opts.xtol);

            let mut trial = params;
            for (p, d) in trial.iter_mut().zip(delta.iter()) {
                *p += d;
            }

            let trial_fit = evaluate(&model, x, &trial, &mut evaluations);
            if let Some(trial_fit) = trial_fit {
                let trial_residuals = residual_vector(y, &trial_fit);
                let trial_sse = trial_residuals.norm_squared();
                if trial_sse < sse {
                    let predicted = sse - (&residuals - &jac * &delta).norm_squared();
                    let ratio = if predicted > 0.0 { (sse - trial_sse) / predicted } else { 0.0 };
                    if ratio < 0.25 {
                        bound = 0.5 * step_norm;
                    } else if ratio >= 0.75 {
                        bound = bound.max(2.0 * step_norm);
                    }
                    radius = Some(bound);

                    let reduction = (sse - trial_sse) / sse;
                    params = trial;
                    fitted = trial_fit;
                    residuals = trial_residuals;
                    sse = trial_sse;
                    damping = (damping / 10.0).max(MIN_DAMPING);

                    if reduction <= opts.ftol || small_step {
                        return Ok(SolverReport { params, sse, evaluations, iterations });
                    }
                    break;
                }
            }

            bound = 0.5 * step_norm;
            radius = Some(bound);

            // The current point is already optimal to within `xtol`.
            if small_step {
                return Ok(SolverReport { params, sse, evaluations, iterations });
            }

            damping *= 10.0;
            if damping > MAX_DAMPING {
                return Err(FitFailure::Stalled);
            }
            if evaluations >= opts.max_evaluations {
                return Err(FitFailure::EvaluationLimit { evaluations });
            }
        }
    }
}

/// `‖D v‖` where `diag` holds the squared column scales.
fn scaled_norm(diag: &[f64], v: impl Iterator<Item = f64>) -> f64 {
    diag.iter().zip(v).map(|(d, vi)| d * vi * vi).sum::<f64>().sqrt()
}

fn evaluate<const P: usize, F>(model: &F, x: &[f64], params: &[f64; P], evaluations: &mut usize) -> Option<Vec<f64>>
where
    F: Fn(f64, &[f64; P]) -> f64,
{
    *evaluations += 1;
    let values: Vec<f64> = x.iter().map(|&xi| model(xi, params)).collect();
    values.iter().all(|v| v.is_finite()).then_some(values)
}

fn residual_vector(y: &[f64], fitted: &[f64]) -> DVector<f64> {
    DVector::from_iterator(y.len(), y.iter().zip(fitted.iter()).map(|(yi, fi)| yi - fi))
}
