//! `Location`, `State`, the cache key, and day paths.

use scaper_core::{Activity, Vehicle, ZoneId};

use crate::Decision;

// ── Location ──────────────────────────────────────────────────────────────────

/// Where a state is.
///
/// `NonFixed(None)` is the all-zones wildcard used only during expected-value
/// computation; `Residence` and `Workplace` always carry one concrete zone.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Location {
    Residence(ZoneId),
    Workplace(ZoneId),
    /// A discretionary location: a concrete zone, or `None` for "all zones
    /// simultaneously" (the compressed form).
    NonFixed(Option<ZoneId>),
}

impl Location {
    /// The concrete zone, if there is one.
    pub fn zone(&self) -> Option<ZoneId> {
        match *self {
            Location::Residence(z) | Location::Workplace(z) => Some(z),
            Location::NonFixed(z) => z,
        }
    }

    /// `true` for the all-zones wildcard.
    #[inline]
    pub fn is_all(&self) -> bool {
        matches!(self, Location::NonFixed(None))
    }

    /// The case tag, dropping the concrete zone.
    pub fn tag(&self) -> LocTag {
        match self {
            Location::Residence(_) => LocTag::Residence,
            Location::Workplace(_) => LocTag::Workplace,
            Location::NonFixed(_)  => LocTag::NonFixed,
        }
    }
}

/// A location's case tag — the part of it that enters the cache key.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LocTag {
    Residence,
    Workplace,
    NonFixed,
}

// ── State ─────────────────────────────────────────────────────────────────────

/// One point of the decision process.  Immutable value type.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct State {
    pub activity: Activity,
    pub location: Location,
    /// Time-of-day in timesteps since DayStart; may be fractional.
    pub time: f64,
    /// Decision steps spent in the current activity, capped at the
    /// activity's `max_tracked_duration`.
    pub duration: u32,
    pub vehicle: Vehicle,
    pub has_worked: bool,
}

impl State {
    /// The expected-value cache key: everything except time and the concrete
    /// zone.  All `NonFixed` zones share one key — their values live in the
    /// zones-major row of the cached entry.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            activity:   self.activity,
            loc:        self.location.tag(),
            duration:   self.duration,
            vehicle:    self.vehicle,
            has_worked: self.has_worked,
        }
    }
}

/// The memoization key of the expected-value cache.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CacheKey {
    pub activity:   Activity,
    pub loc:        LocTag,
    pub duration:   u32,
    pub vehicle:    Vehicle,
    pub has_worked: bool,
}

// ── DayPath ───────────────────────────────────────────────────────────────────

/// The ordered (state, decision) sequence of one agent's day, ending in a
/// state that classifies as `End`.
#[derive(Clone, Debug, PartialEq)]
pub struct DayPath {
    pub steps: Vec<(State, Decision)>,
    pub terminal: State,
}

impl DayPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
