//! Bracketing–sectioning line search (maximization).
//!
//! # Algorithm
//!
//! Given `φ(α) = f(x + α·d)` with `φ'(0) > 0`:
//!
//! 1. Halve the initial step up to 20 times until `φ` is finite.
//! 2. Maintain a bracket `(low, high)`: `low` is the best uphill point with
//!    non-negative slope, `high` (once found) a point that is worse or has
//!    negative slope.  Until a `high` exists, widen by a factor of 10,
//!    capped at `MAX_STEP`.
//! 3. The interior candidate is the cubic Hermite extremum of the two
//!    endpoint `(value, slope)` pairs, clamped to the middle 60% of the
//!    bracket (bisection when the cubic degenerates).
//! 4. Accept on the Wolfe-like curvature test `|φ'(α)| ≤ c·|φ'(0)|` or when
//!    the remaining interval's first-order change `|Δα·φ'(α)|` is below
//!    1e−16.

use thiserror::Error;

/// Widest step the bracket may grow to.
const MAX_STEP: f64 = 1e10;

/// Feasibility halvings allowed before giving up.
const MAX_HALVINGS: usize = 20;

/// One evaluated point on the search line.
#[derive(Copy, Clone, Debug)]
pub struct LinePoint {
    pub alpha: f64,
    pub value: f64,
    /// Directional derivative `φ'(α) = ∇f(x + α·d)·d`.
    pub slope: f64,
}

/// Line-search failure modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum LineSearchError {
    #[error("line search exceeded its iteration budget")]
    MaxIterationsReached,
    #[error("no finite step found")]
    FiniteStepNotFound,
}

/// Tunables; the defaults implement the documented algorithm.
#[derive(Copy, Clone, Debug)]
pub struct LineSearch {
    pub max_iterations: usize,
    /// Curvature factor `c` of the acceptance test.
    pub curvature: f64,
}

impl Default for LineSearch {
    fn default() -> Self {
        Self { max_iterations: 200, curvature: 0.95 }
    }
}

impl LineSearch {
    /// Search from `origin` (the `α = 0` point) with initial step `alpha0`.
    ///
    /// `phi` evaluates one step length to its `(value, slope)` pair.
    pub fn search(
        &self,
        origin: LinePoint,
        alpha0: f64,
        mut phi: impl FnMut(f64) -> (f64, f64),
    ) -> Result<LinePoint, LineSearchError> {
        let eval = |alpha: f64, phi: &mut dyn FnMut(f64) -> (f64, f64)| -> LinePoint {
            let (value, slope) = phi(alpha);
            LinePoint { alpha, value, slope }
        };

        // ── 1. Find a finite starting step ────────────────────────────────
        let mut alpha = alpha0;
        let mut cand = eval(alpha, &mut phi);
        let mut halvings = 0;
        while !cand.value.is_finite() {
            halvings += 1;
            if halvings > MAX_HALVINGS {
                return Err(LineSearchError::FiniteStepNotFound);
            }
            alpha /= 2.0;
            cand = eval(alpha, &mut phi);
        }

        // ── 2. Bracket and section ────────────────────────────────────────
        let mut low = origin;
        let mut high: Option<LinePoint> = None;

        for _ in 0..self.max_iterations {
            let accept = cand.slope.abs() <= self.curvature * origin.slope.abs()
                || ((cand.alpha - low.alpha) * cand.slope).abs() < 1e-16;
            if accept && cand.value.is_finite() {
                return Ok(cand);
            }

            if !cand.value.is_finite() || cand.value < low.value || cand.slope < 0.0 {
                // Worse than low, or already descending: the maximum lies in
                // (low, cand).
                high = Some(cand);
            } else {
                // Still climbing past cand: it becomes the new low.
                low = cand;
                if high.is_none() {
                    let widened = (low.alpha * 10.0).min(MAX_STEP);
                    if widened <= low.alpha {
                        return Err(LineSearchError::MaxIterationsReached);
                    }
                    cand = eval(widened, &mut phi);
                    continue;
                }
            }

            let hi = high.expect("bracket exists past this point");
            let next = cubic_maximum(low, hi);
            cand = eval(next, &mut phi);
        }

        Err(LineSearchError::MaxIterationsReached)
    }
}

/// Cubic Hermite extremum of the bracket, clamped to its middle 60%;
/// bisection when the cubic degenerates.
fn cubic_maximum(low: LinePoint, high: LinePoint) -> f64 {
    let (a0, f0, g0) = (low.alpha, low.value, low.slope);
    let (a1, f1, g1) = (high.alpha, high.value, high.slope);

    let width = a1 - a0;
    let lo_clip = a0 + 0.2 * width;
    let hi_clip = a1 - 0.2 * width;
    let fallback = 0.5 * (a0 + a1);

    if !f1.is_finite() || width <= 0.0 {
        return fallback.clamp(lo_clip, hi_clip);
    }

    let d1 = g0 + g1 - 3.0 * (f0 - f1) / (a0 - a1);
    let disc = d1 * d1 - g0 * g1;
    if disc < 0.0 {
        return fallback.clamp(lo_clip, hi_clip);
    }
    let d2 = disc.sqrt().copysign(a1 - a0);
    let denom = g1 - g0 + 2.0 * d2;
    if denom == 0.0 {
        return fallback.clamp(lo_clip, hi_clip);
    }
    let candidate = a1 - (a1 - a0) * (g1 + d2 - d1) / denom;
    if candidate.is_finite() {
        candidate.clamp(lo_clip, hi_clip)
    } else {
        fallback.clamp(lo_clip, hi_clip)
    }
}

/// Convenience wrapper with default settings.
pub fn search(
    origin: LinePoint,
    alpha0: f64,
    phi: impl FnMut(f64) -> (f64, f64),
) -> Result<LinePoint, LineSearchError> {
    LineSearch::default().search(origin, alpha0, phi)
}
