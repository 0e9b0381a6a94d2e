//! `scaper-state` — the state-space contract.
//!
//! # The three-phase decision cycle
//!
//! The theoretical joint choice "end activity, travel somewhere, start a new
//! activity" is split into three successive transitions through the phase
//! activities `Depart` and `Arrive`:
//!
//! ```text
//! Home ──End──▶ Depart ──Travel(mode, dest)──▶ Arrive ──Start(act)──▶ act
//!   └─Continue─┘                                                        │
//!               ◀──────────────────────End────────────────────────────--┘
//! ```
//!
//! Option generation is intentionally liberal: it emits every structurally
//! possible decision and leaves time-space feasibility to the value function,
//! which assigns `−∞` to decisions whose downstream states are `Bad`.
//!
//! # Compressed vs exploded options
//!
//! During expected-value computation, travel to discretionary locations is a
//! single compressed `Travel(mode, NonFixed(All))` decision whose utilities
//! are matrix-valued over destinations.  During simulation the same choice is
//! *exploded* into one `Travel(mode, NonFixed(Some z))` per world zone so the
//! sampler can draw a concrete destination.

pub mod decision;
pub mod space;
pub mod state;

#[cfg(test)]
mod tests;

pub use decision::Decision;
pub use space::{Feasibility, StateSpace};
pub use state::{CacheKey, DayPath, LocTag, Location, State};
