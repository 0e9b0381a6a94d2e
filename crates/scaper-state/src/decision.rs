//! The decision enum.

use scaper_core::{Activity, Mode};

use crate::Location;

/// One feasible choice out of a state.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Decision {
    /// Begin `Activity` at the current location (from `Arrive`).
    Start(Activity),
    /// Stay in the current activity for one more decision step.
    Continue,
    /// End the current activity and enter the `Depart` phase.
    End,
    /// Travel by `Mode` to `Location` (from `Depart`).
    ///
    /// The destination is `NonFixed(None)` in the compressed all-destinations
    /// form used for expected-value computation, and a concrete location in
    /// the exploded form used during simulation.
    Travel(Mode, Location),
}

impl Decision {
    /// `true` for travel decisions.
    #[inline]
    pub fn is_travel(&self) -> bool {
        matches!(self, Decision::Travel(..))
    }
}
