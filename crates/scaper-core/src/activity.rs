//! Activity enum and per-activity settings.
//!
//! `Depart` and `Arrive` are internal phase markers: the theoretical joint
//! "end activity, travel, start activity" choice is split into three
//! successive transitions so that each step is a plain multinomial choice.
//! They never appear in output trips.

/// Number of activities.  Settings tables are dimensioned `[N_ACTIVITIES]`.
pub const N_ACTIVITIES: usize = 6;

// ── Activity ──────────────────────────────────────────────────────────────────

/// What an agent is doing in a state.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activity {
    /// Phase marker: the agent has ended an activity and is choosing a
    /// mode/destination.
    Depart,
    /// Phase marker: the agent has arrived and is choosing what to start.
    Arrive,
    Home,
    Work,
    Shop,
    Other,
}

impl Activity {
    pub const ALL: [Activity; N_ACTIVITIES] = [
        Activity::Depart,
        Activity::Arrive,
        Activity::Home,
        Activity::Work,
        Activity::Shop,
        Activity::Other,
    ];

    /// Index into per-activity settings tables.
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Activity::Depart => 0,
            Activity::Arrive => 1,
            Activity::Home   => 2,
            Activity::Work   => 3,
            Activity::Shop   => 4,
            Activity::Other  => 5,
        }
    }

    /// `true` for the internal `Depart`/`Arrive` phase markers.
    #[inline]
    pub fn is_phase_marker(self) -> bool {
        matches!(self, Activity::Depart | Activity::Arrive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Depart => "Depart",
            Activity::Arrive => "Arrive",
            Activity::Home   => "Home",
            Activity::Work   => "Work",
            Activity::Shop   => "Shop",
            Activity::Other  => "Other",
        }
    }

    /// Parse a CSV enum value.
    pub fn from_str(s: &str) -> Option<Activity> {
        match s {
            "Depart" => Some(Activity::Depart),
            "Arrive" => Some(Activity::Arrive),
            "Home"   => Some(Activity::Home),
            "Work"   => Some(Activity::Work),
            "Shop"   => Some(Activity::Shop),
            "Other"  => Some(Activity::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ActivitySettings ──────────────────────────────────────────────────────────

/// Per-activity model settings.
///
/// `max_tracked_duration[a]` caps the `duration` state variable for activity
/// `a`: past the cap the marginal utility of continuing is treated as
/// constant, which keeps the state space finite.  Durations count decision
/// steps, not raw timesteps.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivitySettings {
    /// Duration cap per activity, indexed by [`Activity::index`].
    pub max_tracked_duration: [u32; N_ACTIVITIES],

    /// Activities an agent may start at a non-fixed (discretionary) location.
    pub discretionary: Vec<Activity>,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        let mut max_tracked_duration = [12u32; N_ACTIVITIES];
        max_tracked_duration[Activity::Depart.index()] = 0;
        max_tracked_duration[Activity::Arrive.index()] = 0;
        Self {
            max_tracked_duration,
            discretionary: vec![Activity::Shop, Activity::Other],
        }
    }
}

impl ActivitySettings {
    #[inline]
    pub fn max_duration(&self, a: Activity) -> u32 {
        self.max_tracked_duration[a.index()]
    }
}
