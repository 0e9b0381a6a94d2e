//! `scaper-value` — the value-function engine.
//!
//! # The recursive contract
//!
//! For a state `s` with decision set `options(s)`:
//!
//! ```text
//! Φ(s,d) = exp( u(s,d) + EV(s,d) )
//! EV(s,d) = expected V̄ over the integral-time next states of (s,d)
//! V̄(s)   = ln Σ_d Φ(s,d)    (Good)    |    0 (End)    |    −∞ (Bad)
//! ```
//!
//! `V̄` is memoized per [`CacheKey`](scaper_state::CacheKey) at integral
//! timesteps; fractional times interpolate linearly between the bracketing
//! integers.  The traversal is an explicit-stack depth-first search
//! ("expand on first visit, evaluate once all dependencies are cached"), so
//! native stack depth stays O(1) regardless of day length.
//!
//! # Crate layout
//!
//! | Module      | Contents                                               |
//! |-------------|--------------------------------------------------------|
//! | [`cache`]   | `EvCache` — per-agent, per-class memo rows             |
//! | [`kernel`]  | `add_ev` — the vectorizable interpolation inner loop   |
//! | [`context`] | `WorkerCtx` — per-worker pools and offset tables       |
//! | [`engine`]  | `ValueEngine` — traversal, option utilities, logsum    |
//! | [`utility`] | `UtilitySpec` trait, term sinks, `LinearUtility`       |

pub mod cache;
pub mod context;
pub mod engine;
pub mod kernel;
pub mod utility;

#[cfg(test)]
mod tests;

pub use cache::EvCache;
pub use context::{OffsetTables, WorkerCtx};
pub use engine::ValueEngine;
pub use kernel::{add_ev, DestOffsets, TimeSpec};
pub use utility::{LinearUtility, RowCollector, TermSink, UtilityAccumulator, UtilitySpec};
