//! Deterministic per-agent and run-level RNG wrappers.
//!
//! # Determinism strategy
//!
//! Each agent gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (agent_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive agent IDs uniformly across the seed space.
//! This means:
//!
//! - Agents never share RNG state (no contention, no ordering dependency).
//! - Simulation draws are reproducible regardless of the order in which the
//!   worker pool processes agents.
//! - All RNG calls are local to the owning thread; no synchronisation needed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::PersonId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── AgentRng ──────────────────────────────────────────────────────────────────

/// Per-agent deterministic RNG.
///
/// Create one per agent task; the type is `!Sync` to prevent accidental
/// sharing across threads — each worker owns the RNGs of the agents it
/// processes.
pub struct AgentRng(SmallRng);

impl AgentRng {
    /// Seed deterministically from the run's global seed and an agent ID.
    pub fn new(global_seed: u64, agent: PersonId) -> Self {
        let seed = global_seed ^ (agent.0 as u64).wrapping_mul(MIXING_CONSTANT);
        AgentRng(SmallRng::seed_from_u64(seed))
    }

    /// A uniform draw in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// A uniform draw in `[0, bound)`.
    #[inline]
    pub fn uniform_to(&mut self, bound: f64) -> f64 {
        self.0.gen_range(0.0..bound)
    }

    /// Inverse-CDF draw from an unnormalized non-negative weight slice.
    ///
    /// Returns the index of the selected element.
    ///
    /// # Panics
    ///
    /// Panics if the weights sum to zero or are non-finite — callers must
    /// validate first (a zero-mass choice inside the simulator is a bug).
    pub fn draw_index(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        assert!(
            total > 0.0 && total.is_finite(),
            "draw_index on zero or non-finite mass: {total}"
        );
        let mut u = self.uniform_to(total);
        for (i, &w) in weights.iter().enumerate() {
            u -= w;
            if u < 0.0 {
                return i;
            }
        }
        // Floating-point underrun on the last bucket.
        weights.len() - 1
    }
}

// ── RunRng ────────────────────────────────────────────────────────────────────

/// Run-level RNG for global operations (estimation restarts, seeding).
///
/// Used only in single-threaded contexts; per-agent randomness always goes
/// through [`AgentRng`].
pub struct RunRng(SmallRng);

impl RunRng {
    pub fn new(seed: u64) -> Self {
        RunRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// Derive a child seed with a different offset — useful for seeding
    /// independent sub-streams deterministically from the root seed.
    pub fn child_seed(&mut self, offset: u64) -> u64 {
        self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT)
    }
}
