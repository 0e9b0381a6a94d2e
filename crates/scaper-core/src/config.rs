//! Top-level model configuration.
//!
//! Owned by the entry point and passed to workers by reference — there is no
//! global mutable state anywhere in the engine.

use crate::{ActivitySettings, ModeRules, TimeGrid};

/// Everything about the model that is not data: the time grid, activity
/// settings, and mode availability rules.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelConfig {
    pub grid: TimeGrid,
    pub activities: ActivitySettings,
    pub modes: ModeRules,
    /// Master RNG seed.  The same seed always produces identical draws.
    pub seed: u64,
}
