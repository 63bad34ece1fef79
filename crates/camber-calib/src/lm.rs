//! Levenberg–Marquardt minimization with numeric central-difference Jacobians.
//!
//! Both the intrinsic bundle refinement and the PnP pose refinement reduce to
//! the same dense nonlinear least-squares shape, so the damped-normal-equation
//! loop lives here and the callers only provide a residual closure.

use nalgebra::{DMatrix, DVector};

/// Parameters controlling the LM minimization.
#[derive(Debug, Clone)]
pub struct LmParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Convergence threshold on the relative squared-error decrease.
    pub eps: f64,
    /// Initial damping factor (lambda).
    pub lambda_init: f64,
    /// Multiplicative factor to increase/decrease lambda.
    pub lambda_mul: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iters: 60,
            eps: 1e-12,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// Result of an LM minimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Final parameter vector.
    pub x: DVector<f64>,
    /// Final sum of squared residuals.
    pub sum_sq: f64,
    /// Number of iterations taken.
    pub iterations: usize,
    /// Whether a convergence criterion was met before `max_iters`.
    pub converged: bool,
}

const LAMBDA_MAX: f64 = 1e12;
const STEP_EPS: f64 = 1e-12;
const GRAD_EPS: f64 = 1e-12;

/// Minimize the squared norm of a residual vector over the parameters `x0`.
///
/// # Arguments
/// * `x0` – Initial parameter vector.
/// * `num_residuals` – Length of the residual vector.
/// * `residual_fn` – Writes the residuals for a parameter vector into its
///   second argument.
/// * `params` – Damping schedule and stopping thresholds.
pub fn minimize<F>(
    x0: DVector<f64>,
    num_residuals: usize,
    residual_fn: F,
    params: &LmParams,
) -> LmResult
where
    F: Fn(&DVector<f64>, &mut DVector<f64>),
{
    let dim = x0.len();
    let mut x = x0;

    let mut residuals = DVector::<f64>::zeros(num_residuals);
    let mut residuals_p = DVector::<f64>::zeros(num_residuals);
    let mut residuals_m = DVector::<f64>::zeros(num_residuals);

    residual_fn(&x, &mut residuals);
    let mut err_sq = residuals.norm_squared();

    let mut lambda = params.lambda_init;
    let mut jacobian = DMatrix::<f64>::zeros(num_residuals, dim);

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < params.max_iters {
        iterations += 1;

        // numeric Jacobian, central differences
        for j in 0..dim {
            let h = 1e-6 * x[j].abs().max(1.0);
            let saved = x[j];

            x[j] = saved + h;
            residual_fn(&x, &mut residuals_p);
            x[j] = saved - h;
            residual_fn(&x, &mut residuals_m);
            x[j] = saved;

            let inv_2h = 1.0 / (2.0 * h);
            for i in 0..num_residuals {
                jacobian[(i, j)] = (residuals_p[i] - residuals_m[i]) * inv_2h;
            }
        }

        let jt = jacobian.transpose();
        let hessian = &jt * &jacobian;
        let gradient = &jt * &residuals;

        if gradient.amax() < GRAD_EPS {
            converged = true;
            break;
        }

        // damped normal equations, retried with stronger damping on failure
        let mut step = None;
        while lambda < LAMBDA_MAX {
            let mut damped = hessian.clone();
            for d in 0..dim {
                damped[(d, d)] += lambda * hessian[(d, d)].max(1e-12);
            }
            if let Some(chol) = damped.cholesky() {
                step = Some(chol.solve(&(-&gradient)));
                break;
            }
            lambda *= params.lambda_mul;
        }
        let Some(delta) = step else {
            break;
        };

        if delta.norm() < STEP_EPS * (x.norm() + STEP_EPS) {
            converged = true;
            break;
        }

        let x_new = &x + &delta;
        residual_fn(&x_new, &mut residuals_p);
        let err_new = residuals_p.norm_squared();

        if err_new < err_sq {
            let rel_decrease = (err_sq - err_new) / err_sq.max(f64::MIN_POSITIVE);
            x = x_new;
            std::mem::swap(&mut residuals, &mut residuals_p);
            err_sq = err_new;
            lambda = (lambda / params.lambda_mul).max(1e-12);

            if rel_decrease < params.eps || err_sq < 1e-20 {
                converged = true;
                break;
            }
        } else {
            lambda *= params.lambda_mul;
            if lambda >= LAMBDA_MAX {
                // cannot make progress anymore; treat a tiny residual as done
                converged = err_sq < 1e-16;
                break;
            }
        }
    }

    LmResult {
        x,
        sum_sq: err_sq,
        iterations,
        converged,
    }
}
