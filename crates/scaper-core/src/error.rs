//! Framework error type.
//!
//! Sub-crates define their own error enums and either convert into
//! `CoreError` via `From` impls or wrap it as one variant.  Programmer
//! errors (shape mismatches in matrix arithmetic, impossible states inside
//! the simulator) are **panics**, not variants: reaching them means the
//! engine itself is wrong and unwinding with a partial result would hide the
//! bug.

use thiserror::Error;

use crate::PersonId;

/// The top-level error type for `scaper-core` and a common base for
/// sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("agent {0} not found")]
    AgentNotFound(PersonId),

    #[error("input format error: {0}")]
    InputFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `scaper-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
