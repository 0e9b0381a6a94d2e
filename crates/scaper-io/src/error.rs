//! I/O subsystem error type.

use thiserror::Error;

/// Errors from loaders and sinks.
#[derive(Debug, Error)]
pub enum IoError {
    /// Missing columns, malformed enum values, unsorted network rows.
    /// Fatal at startup.
    #[error("input format error: {0}")]
    InputFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "parquet")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "parquet")]
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type IoResult<T> = Result<T, IoError>;
