//! `scaper-sim` — forward simulation on top of the value function.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`simulate`]  | latent-class draw + day-path sampling (exploded options)  |
//! | [`trips`]     | `Trip`, path ↔ trip-list conversion, path utilities       |
//! | [`choiceset`] | `Choiceset` generation with MNL sampling corrections      |
//! | [`error`]     | `SimError`, `SimResult`                                   |
//!
//! # Error policy
//!
//! Observed trips that do not map onto a feasible `Good → … → End` day path
//! are **recoverable**: the agent is skipped with a warning.  A `Bad` state
//! or a zero-mass choice distribution reached *during* simulation is a bug
//! in the state space or the value function and panics.

pub mod choiceset;
pub mod error;
pub mod simulate;
pub mod trips;

#[cfg(test)]
mod tests;

pub use choiceset::{build_choiceset, Alternative, Choiceset, ChoicesetOptions};
pub use error::{SimError, SimResult};
pub use simulate::{class_probabilities, draw_class, simulate_day};
pub use trips::{path_to_trips, path_utility, trips_to_path, Trip};
