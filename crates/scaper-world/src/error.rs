//! World-subsystem error type.

use scaper_core::ZoneId;
use thiserror::Error;

/// Errors produced by `scaper-world`.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("zone {0} not found in this world")]
    ZoneNotFound(ZoneId),

    #[error("zone sample size {requested} exceeds zone count {available}")]
    SampleTooLarge { requested: usize, available: usize },

    #[error("zone sampling probabilities sum to zero")]
    DegenerateSamplingModel,
}

pub type WorldResult<T> = Result<T, WorldError>;
