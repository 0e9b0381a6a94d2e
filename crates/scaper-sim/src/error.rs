//! Simulation-subsystem error type.

use scaper_core::PersonId;
use scaper_world::WorldError;
use thiserror::Error;

/// Recoverable errors from simulation and choice-set generation.
///
/// Programmer errors (`Bad` states mid-simulation, zero choice mass in a
/// `Good` state) are panics, not variants.
#[derive(Debug, Error)]
pub enum SimError {
    /// The observed trips do not form a feasible day path under the current
    /// model.  The agent is skipped; the run continues.
    #[error("agent {0}: observed trips are infeasible under the current model")]
    InfeasibleObservation(PersonId),

    #[error(transparent)]
    World(#[from] WorldError),
}

pub type SimResult<T> = Result<T, SimError>;
