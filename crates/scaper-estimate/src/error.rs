//! Estimation-subsystem error type.

use scaper_world::WorldError;
use thiserror::Error;

use crate::linesearch::LineSearchError;

/// Errors from cost-function construction and optimization.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// Parameters flagged `estimate` that never appear in any observation's
    /// variables.  The optimizer would wander freely in those dimensions, so
    /// construction refuses to proceed.
    #[error("estimated parameters never observed in the data: {}", .0.join(", "))]
    MissingEstimatedParameters(Vec<String>),

    #[error("no usable observations in the choiceset input")]
    NoObservations,

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("line search failed: {0}")]
    LineSearch(#[from] LineSearchError),

    #[error(transparent)]
    World(#[from] WorldError),
}

pub type EstimateResult<T> = Result<T, EstimateError>;
