//! Trips and the path ↔ trip-list conversions.

use scaper_core::{Activity, Mode, ParamSet, PersonId, ZoneId};
use scaper_mat::{Mat, Shape};
use scaper_state::{DayPath, Decision, Feasibility, LocTag, Location, State, StateSpace};
use scaper_value::{UtilityAccumulator, UtilitySpec};

// ── Trip ──────────────────────────────────────────────────────────────────────

/// One output trip: a travel decision followed by the activity it starts.
///
/// Travel and arrival times are derived from LOS at output time; the trip
/// itself stores only the exact departure.
#[derive(Clone, Debug, PartialEq)]
pub struct Trip {
    pub person: PersonId,
    /// Latent class the path was simulated under (annotation only).
    pub class: usize,
    /// The activity started on arrival.
    pub activity: Activity,
    pub mode: Mode,
    pub origin: ZoneId,
    pub dest: ZoneId,
    /// Departure time-of-day in timesteps since DayStart.
    pub depart_time: f64,
}

impl Trip {
    /// Journey equality: everything except the latent-class annotation.
    /// This is the equality under which choiceset alternatives deduplicate.
    pub fn same_journey(&self, other: &Trip) -> bool {
        self.person == other.person
            && self.activity == other.activity
            && self.mode == other.mode
            && self.origin == other.origin
            && self.dest == other.dest
            && self.depart_time == other.depart_time
    }
}

/// Element-wise journey equality of two trip lists.
pub fn same_journeys(a: &[Trip], b: &[Trip]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_journey(y))
}

// ── Forward: path → trips ─────────────────────────────────────────────────────

/// Scan a day path and emit one [`Trip`] per `Travel` followed by `Start`.
pub fn path_to_trips(person: PersonId, class: usize, path: &DayPath) -> Vec<Trip> {
    let mut trips = Vec::new();
    for pair in path.steps.windows(2) {
        let (travel_state, travel_decision) = &pair[0];
        let (_, next_decision) = &pair[1];
        if let (Decision::Travel(mode, dest), Decision::Start(activity)) =
            (travel_decision, next_decision)
        {
            trips.push(Trip {
                person,
                class,
                activity: *activity,
                mode: *mode,
                origin: travel_state
                    .location
                    .zone()
                    .expect("impossible state: travel from a wildcard location"),
                dest: dest
                    .zone()
                    .expect("impossible state: simulated travel to a wildcard"),
                depart_time: travel_state.time,
            });
        }
    }
    trips
}

// ── Reverse: trips → path ─────────────────────────────────────────────────────

/// Rebuild the day path an observed trip list implies, or `None` if any
/// produced state is infeasible or the day does not close at home.
///
/// Waiting time is filled with `Continue` decisions; a trip's
/// `End → Travel → Start` burst fires once the walk reaches the departure's
/// half-step threshold.
pub fn trips_to_path(space: &StateSpace<'_, '_>, trips: &[Trip]) -> Option<DayPath> {
    let mut steps: Vec<(State, Decision)> = Vec::new();
    let mut s = space.start_state();

    let mut push = |steps: &mut Vec<(State, Decision)>, s: &mut State, d: Decision| -> bool {
        if space.classify(s) != Feasibility::Good {
            return false;
        }
        steps.push((*s, d));
        *s = space.next_single_state(s, &d);
        true
    };

    for trip in trips {
        // Wait out the time before departure.
        loop {
            let step = space.cfg.grid.decision_step(s.time);
            if step <= 0.0 || s.time + step / 2.0 >= trip.depart_time {
                break;
            }
            if !push(&mut steps, &mut s, Decision::Continue) {
                return None;
            }
        }

        if s.location.zone() != Some(trip.origin) {
            return None; // the observation's origin contradicts the walk
        }
        let dest = location_of(trip.activity, trip.dest);
        if !push(&mut steps, &mut s, Decision::End)
            || !push(&mut steps, &mut s, Decision::Travel(trip.mode, dest))
            || !push(&mut steps, &mut s, Decision::Start(trip.activity))
        {
            return None;
        }
    }

    // Fill the rest of the day in the final activity.
    while space.classify(&s) == Feasibility::Good {
        if space.cfg.grid.decision_step(s.time) <= 0.0 {
            return None;
        }
        if !push(&mut steps, &mut s, Decision::Continue) {
            return None;
        }
    }

    (space.classify(&s) == Feasibility::End).then_some(DayPath { steps, terminal: s })
}

/// The location type an activity implies at a destination zone.
fn location_of(activity: Activity, dest: ZoneId) -> Location {
    match activity {
        Activity::Home => Location::Residence(dest),
        Activity::Work => Location::Workplace(dest),
        _ => Location::NonFixed(Some(dest)),
    }
}

// ── Path utility ──────────────────────────────────────────────────────────────

/// `U(ζ | class)` — the summed systematic utility of a concrete day path,
/// including zone-sampling corrections on NonFixed travels (the same
/// definition the value engine uses for its option utilities).
pub fn path_utility(
    space: &StateSpace<'_, '_>,
    utility: &dyn UtilitySpec,
    params: &ParamSet,
    class: usize,
    path: &DayPath,
) -> f64 {
    let mut acc = Mat::zeros(Shape::Scalar);
    for (state, decision) in &path.steps {
        {
            let mut sink = UtilityAccumulator { params, class, acc: &mut acc };
            utility.decision_terms(space, state, decision, &mut sink);
        }
        if let Decision::Travel(_, dest) = decision {
            if dest.tag() == LocTag::NonFixed && space.world.is_sampled() {
                let o = space.zone_axis(&state.location);
                let d = space.zone_axis(dest);
                acc.add_assign(&space.world.corrections(o, d));
            }
        }
    }
    acc.value(0, 0)
}
