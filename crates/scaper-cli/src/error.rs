//! CLI error type: a thin umbrella over the subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] scaper_core::CoreError),

    #[error(transparent)]
    Io(#[from] scaper_io::IoError),

    #[error(transparent)]
    World(#[from] scaper_world::WorldError),

    #[error(transparent)]
    Sim(#[from] scaper_sim::SimError),

    #[error(transparent)]
    Estimate(#[from] scaper_estimate::EstimateError),

    #[error("I/O error: {0}")]
    StdIo(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Usage(String),
}

pub type CliResult<T> = Result<T, CliError>;
