//! `scaper-core` — foundational types for the scaper microsimulation engine.
//!
//! This crate is a dependency of every other `scaper-*` crate.  It
//! intentionally has no `scaper-*` dependencies and minimal external ones
//! (only `rand`, `thiserror`, and `log`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                             |
//! |--------------|------------------------------------------------------|
//! | [`ids`]      | `PersonId`, `ZoneId`                                 |
//! | [`mode`]     | `Mode`, `Vehicle` enums                              |
//! | [`activity`] | `Activity` enum and `ActivitySettings`               |
//! | [`time`]     | `TimeGrid` — the day's discrete timestep model       |
//! | [`agent`]    | `Agent`, `AgentSet`                                  |
//! | [`params`]   | `ParamSet` — permissive named-parameter table        |
//! | [`rng`]      | `AgentRng` (per-agent), `RunRng` (run-level)         |
//! | [`error`]    | `CoreError`, `CoreResult`                            |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                               |
//! |---------|------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.  |

pub mod activity;
pub mod agent;
pub mod config;
pub mod error;
pub mod ids;
pub mod mode;
pub mod params;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use activity::{Activity, ActivitySettings, N_ACTIVITIES};
pub use agent::{Agent, AgentSet};
pub use config::ModelConfig;
pub use error::{CoreError, CoreResult};
pub use ids::{PersonId, ZoneId};
pub use mode::{Mode, ModeRules, Vehicle, N_MODES};
pub use params::{Param, ParamSet};
pub use rng::{AgentRng, RunRng};
pub use time::TimeGrid;
