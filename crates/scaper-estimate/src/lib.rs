//! `scaper-estimate` — maximum-likelihood estimation.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                |
//! |----------------|---------------------------------------------------------|
//! | [`cost`]       | `CostFunction` trait, latent-class path MNL,            |
//! |                | zone-sampling destination MNL                           |
//! | [`linesearch`] | bracketing–sectioning maximizing line search            |
//! | [`bfgs`]       | quasi-Newton driver, sandwich standard errors           |
//! | [`error`]      | `EstimateError`, `EstimateResult`                       |
//!
//! # Numerical conventions
//!
//! Everything **maximizes**.  The approximate inverse Hessian `H` tracks
//! `(−∇²f)⁻¹` (positive definite for concave `f`), so the ascent direction
//! is `H·∇f` and the curvature guard uses the gradient *decrease*
//! `y = −Δ∇f`.

pub mod bfgs;
pub mod cost;
pub mod error;
pub mod linesearch;


pub use bfgs::{maximize, maximize_from, maximize_restarts, BfgsOptions, Outcome, Termination};
pub use cost::{latent_class_cost, zone_sampling_cost, CostFunction, Evaluation, MnlCost};
pub use error::{EstimateError, EstimateResult};
pub use linesearch::{search, LinePoint, LineSearch, LineSearchError};
