//! Agent records and the loaded agent population.

use crate::{PersonId, ZoneId};

// ── Agent ─────────────────────────────────────────────────────────────────────

/// One simulated individual.
///
/// Immutable after loading; all per-agent mutable state lives in the
/// simulation's own structures (states, caches, RNGs).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Agent {
    pub id: PersonId,

    // ── Demographics ──────────────────────────────────────────────────────
    pub age:      f64,
    pub female:   bool,
    /// Annual income, in the input file's currency unit.
    pub income:   f64,
    pub has_kids: bool,

    // ── Fixed geography ───────────────────────────────────────────────────
    pub home_zone: ZoneId,
    /// `None` for agents without a fixed workplace.
    pub work_zone: Option<ZoneId>,

    // ── Mobility resources ────────────────────────────────────────────────
    pub owns_car:     bool,
    pub transit_card: bool,

    /// Expansion weight applied to this agent's likelihood contribution.
    pub weight: f64,

    /// Mandated work duration in timesteps, if the agent's work schedule is
    /// fixed.  `None` means work duration is freely chosen.
    pub work_duration: Option<u32>,
}

impl Agent {
    /// `true` if this agent has a fixed workplace.
    #[inline]
    pub fn has_work(&self) -> bool {
        self.work_zone.is_some()
    }
}

// ── AgentSet ──────────────────────────────────────────────────────────────────

/// The loaded agent population, in file order.
#[derive(Clone, Debug, Default)]
pub struct AgentSet {
    pub agents: Vec<Agent>,
}

impl AgentSet {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    /// Look up an agent by external id.  O(n); used only on the estimation
    /// path where choicesets reference agents by id.
    pub fn by_id(&self, id: PersonId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }
}
