//! The BFGS maximizer.
//!
//! Tracks `H ≈ (−∇²f)⁻¹` (positive definite where `f` is concave), so the
//! ascent direction is `H·∇f` and the curvature guard tests the gradient
//! *decrease* `y = ∇f(xₖ) − ∇f(xₖ₊₁)` against the step `s`: `sᵀy ≤ 0` resets
//! `H` to the identity, anything else applies the standard rank-2 update.

use nalgebra::{DMatrix, DVector};

use scaper_core::RunRng;

use crate::cost::{CostFunction, Evaluation};
use crate::linesearch::{LinePoint, LineSearch, LineSearchError};

// ── Options & outcome ─────────────────────────────────────────────────────────

/// Optimizer tunables.
#[derive(Clone, Debug)]
pub struct BfgsOptions {
    pub max_iterations: usize,
    /// Convergence: `|Δf| ≤ f_tol` and `Σ|∇f| < g_tol`.
    pub f_tol: f64,
    pub g_tol: f64,
    /// Cap on the worst-case coordinate move of the first trial step.
    pub max_var_change: f64,
    /// Use a central-difference Hessian for the standard errors instead of
    /// the BFGS estimate.
    pub numerical_hessian: bool,
}

impl Default for BfgsOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            f_tol: 1e-10,
            g_tol: 1e-6,
            max_var_change: 1.0,
            numerical_hessian: false,
        }
    }
}

/// Why the optimizer stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
    /// `|Δf|` and `Σ|∇f|` both within tolerance.
    Converged,
    MaxIterations,
    /// The line search gave up; the last finite point is reported.
    LineSearch(LineSearchError),
    /// Non-finite direction or gradient.
    Numerical(String),
}

/// The optimizer's result.  Standard errors are reported for every
/// termination kind, evaluated at the last finite point.
#[derive(Clone, Debug)]
pub struct Outcome {
    pub theta: DVector<f64>,
    pub value: f64,
    pub gradient: DVector<f64>,
    pub std_errors: DVector<f64>,
    pub termination: Termination,
    pub iterations: usize,
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Maximize `cost` from its starting point.
pub fn maximize(cost: &dyn CostFunction, options: &BfgsOptions) -> Outcome {
    maximize_from(cost, cost.start(), options)
}

/// Maximize `cost` from an explicit starting point.
pub fn maximize_from(cost: &dyn CostFunction, start: DVector<f64>, options: &BfgsOptions) -> Outcome {
    let k = cost.dim();
    let mut x = start;
    let mut e = cost.eval(&x);

    if !e.value.is_finite() || e.grad.iter().any(|g| !g.is_finite()) {
        let std_errors = DVector::zeros(k);
        return Outcome {
            theta: x,
            value: e.value,
            gradient: e.grad.clone(),
            std_errors,
            termination: Termination::Numerical("infeasible starting point".into()),
            iterations: 0,
        };
    }

    // H₀: inverse of the score matrix at the start; identity if singular.
    let mut h = e
        .score
        .clone()
        .try_inverse()
        .unwrap_or_else(|| DMatrix::identity(k, k));

    let search = LineSearch::default();
    let mut alpha_prev: f64 = 1.0;
    let mut termination = Termination::MaxIterations;
    let mut iterations = 0;

    for iter in 0..options.max_iterations {
        iterations = iter + 1;

        let mut d = &h * &e.grad;
        let mut slope0 = d.dot(&e.grad);
        if slope0 <= 0.0 {
            // H lost positive definiteness; restart from steepest ascent.
            h = DMatrix::identity(k, k);
            d = e.grad.clone();
            slope0 = d.dot(&e.grad);
        }

        let d_sum: f64 = d.iter().map(|v| v.abs()).sum();
        if !d_sum.is_finite() {
            termination = Termination::Numerical("non-finite search direction".into());
            break;
        }
        if d_sum == 0.0 {
            termination = Termination::Converged;
            break;
        }

        let alpha0 = (alpha_prev * 10.0)
            .min(options.max_var_change / d_sum)
            .min(1.0);

        let origin = LinePoint { alpha: 0.0, value: e.value, slope: slope0 };
        let mut evals: Vec<(f64, Evaluation)> = Vec::new();
        let result = search.search(origin, alpha0, |alpha| {
            let trial = &x + &d * alpha;
            let ev = cost.eval(&trial);
            let pair = (ev.value, ev.grad.dot(&d));
            evals.push((alpha, ev));
            pair
        });

        let point = match result {
            Ok(p) => p,
            Err(err) => {
                termination = Termination::LineSearch(err);
                break;
            }
        };

        let e_new = evals
            .into_iter()
            .rev()
            .find(|(a, _)| *a == point.alpha)
            .map(|(_, ev)| ev)
            .unwrap_or_else(|| cost.eval(&(&x + &d * point.alpha)));
        let x_new = &x + &d * point.alpha;

        // ── Inverse-Hessian update ────────────────────────────────────────
        let s = &x_new - &x;
        let y = &e.grad - &e_new.grad; // gradient decrease along the step
        let sy = s.dot(&y);
        if sy <= 0.0 {
            h = DMatrix::identity(k, k);
        } else {
            let rho = 1.0 / sy;
            let identity = DMatrix::identity(k, k);
            let left = &identity - (&s * y.transpose()) * rho;
            let right = &identity - (&y * s.transpose()) * rho;
            h = &left * &h * &right + (&s * s.transpose()) * rho;
        }

        let converged = (e_new.value - e.value).abs() <= options.f_tol
            && e_new.grad.iter().map(|g| g.abs()).sum::<f64>() < options.g_tol;

        alpha_prev = point.alpha;
        x = x_new;
        e = e_new;

        if converged {
            termination = Termination::Converged;
            break;
        }
    }

    let std_errors = standard_errors(cost, &x, &e, &h, options);
    Outcome {
        theta: x,
        value: e.value,
        gradient: e.grad.clone(),
        std_errors,
        termination,
        iterations,
    }
}

/// Multi-start wrapper: the first run starts at the parameter-file values,
/// later runs multiply the start elementwise by `spread · U(0,1)`.  The best
/// finite outcome wins, converged outcomes preferred.
pub fn maximize_restarts(
    cost: &dyn CostFunction,
    options: &BfgsOptions,
    restarts: usize,
    spread: f64,
    rng: &mut RunRng,
) -> Outcome {
    let mut best = maximize(cost, options);
    for attempt in 1..restarts.max(1) {
        let start = cost.start().map(|v| v * spread * rng.uniform());
        let outcome = maximize_from(cost, start, options);
        log::info!(
            "restart {attempt}: value {:.6} ({:?})",
            outcome.value,
            outcome.termination
        );
        let better = outcome.value.is_finite()
            && (!best.value.is_finite()
                || outcome.value > best.value
                || (best.termination != Termination::Converged
                    && outcome.termination == Termination::Converged));
        if better {
            best = outcome;
        }
    }
    best
}

// ── Standard errors ───────────────────────────────────────────────────────────

/// `sqrt(diag(H·B·H))` where `B` is the weighted score outer-product matrix
/// and `H` the inverse (negative) Hessian — numerical when requested, the
/// BFGS estimate otherwise.
fn standard_errors(
    cost: &dyn CostFunction,
    x: &DVector<f64>,
    e: &Evaluation,
    h_bfgs: &DMatrix<f64>,
    options: &BfgsOptions,
) -> DVector<f64> {
    let k = x.len();
    let h = if options.numerical_hessian {
        numerical_neg_hessian_inverse(cost, x).unwrap_or_else(|| h_bfgs.clone())
    } else {
        h_bfgs.clone()
    };
    let cov = &h * &e.score * &h;
    DVector::from_iterator(k, (0..k).map(|i| cov[(i, i)].max(0.0).sqrt()))
}

/// Central differences of the gradient, `ε = 1e−8`, symmetrized and negated
/// before inversion.  `None` when the result is singular.
fn numerical_neg_hessian_inverse(cost: &dyn CostFunction, x: &DVector<f64>) -> Option<DMatrix<f64>> {
    const EPS: f64 = 1e-8;
    let k = x.len();
    let mut hessian = DMatrix::zeros(k, k);
    for i in 0..k {
        let mut plus = x.clone();
        plus[i] += EPS;
        let mut minus = x.clone();
        minus[i] -= EPS;
        let g_plus = cost.eval(&plus).grad;
        let g_minus = cost.eval(&minus).grad;
        for j in 0..k {
            hessian[(i, j)] = (g_plus[j] - g_minus[j]) / (2.0 * EPS);
        }
    }
    let symmetric = (&hessian + hessian.transpose()) * 0.5;
    (-symmetric).try_inverse()
}
