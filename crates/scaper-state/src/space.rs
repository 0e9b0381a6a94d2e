//! The state-space contract: feasibility, option generation, transitions.

use scaper_core::{Activity, Agent, ModelConfig, Vehicle};
use scaper_world::{World, ZoneAxis};

use crate::{Decision, Location, State};

// ── Feasibility ───────────────────────────────────────────────────────────────

/// The feasibility class of a state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Feasibility {
    /// A live state with options; its value is the logsum over them.
    Good,
    /// Infeasible; its value is `−∞`.
    Bad,
    /// A valid day terminus; its value is 0.
    End,
}

// ── StateSpace ────────────────────────────────────────────────────────────────

/// The state space of one agent over one world view.
///
/// Bundles the three read-only inputs every contract function needs, so call
/// sites stay short.  Plain shared references — copying one is free.
#[derive(Clone, Copy)]
pub struct StateSpace<'a, 'm> {
    pub cfg:   &'a ModelConfig,
    pub agent: &'a Agent,
    pub world: &'a World<'m>,
}

impl<'a, 'm> StateSpace<'a, 'm> {
    pub fn new(cfg: &'a ModelConfig, agent: &'a Agent, world: &'a World<'m>) -> Self {
        Self { cfg, agent, world }
    }

    // ── Start state ───────────────────────────────────────────────────────

    /// Every day begins at home at DayStart.
    pub fn start_state(&self) -> State {
        State {
            activity:   Activity::Home,
            location:   Location::Residence(self.agent.home_zone),
            time:       0.0,
            duration:   1,
            vehicle:    Vehicle::None,
            has_worked: false,
        }
    }

    // ── Feasibility ───────────────────────────────────────────────────────

    /// Classify a state as `Good`, `Bad`, or `End`.
    pub fn classify(&self, s: &State) -> Feasibility {
        let day_len = self.cfg.grid.day_length() as f64;
        if s.time < 0.0 || s.time > day_len {
            return Feasibility::Bad;
        }

        if s.time == day_len {
            let at_home = s.activity == Activity::Home
                && s.location == Location::Residence(self.agent.home_zone);
            let work_done = s.has_worked == self.agent.has_work();
            return if at_home && work_done {
                Feasibility::End
            } else {
                Feasibility::Bad
            };
        }

        match s.activity {
            Activity::Home if s.location != Location::Residence(self.agent.home_zone) => {
                Feasibility::Bad
            }
            Activity::Work => match self.agent.work_zone {
                Some(w) if s.location == Location::Workplace(w) => Feasibility::Good,
                _ => Feasibility::Bad,
            },
            _ => Feasibility::Good,
        }
    }

    // ── Option generation ─────────────────────────────────────────────────

    /// Append the decisions available from `s`.
    ///
    /// Liberal by design: no look-ahead feasibility checks.  Decisions whose
    /// resulting states are `Bad` get `−∞` value downstream and vanish from
    /// the choice distribution.
    pub fn options(&self, s: &State, explode: bool, out: &mut Vec<Decision>) {
        match s.activity {
            Activity::Depart => self.travel_options(s, explode, out),
            Activity::Arrive => self.start_options(s, out),
            _ => {
                out.push(Decision::Continue);
                out.push(Decision::End);
            }
        }
    }

    fn travel_options(&self, s: &State, explode: bool, out: &mut Vec<Decision>) {
        let home = Location::Residence(self.agent.home_zone);
        for &mode in self.cfg.modes.available(self.agent.owns_car) {
            if s.location != home {
                out.push(Decision::Travel(mode, home));
            }
            if let Some(w) = self.agent.work_zone {
                let work = Location::Workplace(w);
                if s.location != work {
                    out.push(Decision::Travel(mode, work));
                }
            }
            if explode {
                for i in 0..self.world.num_zones() {
                    out.push(Decision::Travel(
                        mode,
                        Location::NonFixed(Some(self.world.zone_at(i))),
                    ));
                }
            } else {
                out.push(Decision::Travel(mode, Location::NonFixed(None)));
            }
        }
    }

    fn start_options(&self, s: &State, out: &mut Vec<Decision>) {
        match s.location {
            Location::Residence(_) => out.push(Decision::Start(Activity::Home)),
            Location::Workplace(_) => out.push(Decision::Start(Activity::Work)),
            Location::NonFixed(_) => {
                for &a in &self.cfg.activities.discretionary {
                    out.push(Decision::Start(a));
                }
            }
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// The state reached by taking `d` from `s`, arriving at `new_time`.
    pub fn next_state(&self, s: &State, d: &Decision, new_time: f64) -> State {
        let new_time = self.cfg.grid.snap(new_time);
        match *d {
            Decision::Start(a) => {
                let duration = 1.min(self.cfg.activities.max_duration(a));
                State {
                    activity: a,
                    location: s.location,
                    time: new_time,
                    duration,
                    vehicle: s.vehicle,
                    has_worked: self.worked_after(s, a, 1),
                }
            }

            Decision::Continue => {
                let cap = self.cfg.activities.max_duration(s.activity);
                State {
                    duration: (s.duration + 1).min(cap),
                    time: new_time,
                    has_worked: self.worked_after(s, s.activity, s.duration + 1),
                    ..*s
                }
            }

            Decision::End => State {
                activity: Activity::Depart,
                duration: 0,
                time: new_time,
                ..*s
            },

            Decision::Travel(mode, dest) => {
                let vehicle = if dest.tag() == crate::LocTag::Residence {
                    // Vehicles are garaged at home.
                    Vehicle::None
                } else if s.location.tag() == crate::LocTag::Residence {
                    mode.vehicle()
                } else {
                    s.vehicle
                };
                State {
                    activity: Activity::Arrive,
                    location: dest,
                    time: new_time,
                    duration: 0,
                    vehicle,
                    ..*s
                }
            }
        }
    }

    /// `has_worked` after reaching `activity` with `elapsed` uncapped
    /// decision steps in it.
    ///
    /// Mandated agents flip the flag only on completing *exactly* the
    /// mandated span; continuing past it clears the flag again.  Unmandated
    /// agents set it stickily on any work participation.
    fn worked_after(&self, s: &State, activity: Activity, elapsed: u32) -> bool {
        if activity != Activity::Work {
            return s.has_worked;
        }
        match self.mandated_steps() {
            Some(w) => elapsed == w,
            None => true,
        }
    }

    /// The mandated work duration in decision-step units, if any.
    pub fn mandated_steps(&self) -> Option<u32> {
        self.agent
            .work_duration
            .map(|ts| ts.div_ceil(self.cfg.grid.decision_steps).max(1))
    }

    // ── Deterministic time stepping ───────────────────────────────────────

    /// The concrete next state used by the simulator: `End` is instantaneous,
    /// `Travel` consumes its exact blended door-to-door duration, everything
    /// else advances by one decision step.
    ///
    /// # Panics
    ///
    /// Panics on a compressed (`NonFixed(None)`) travel destination — only
    /// exploded decisions are simulated.
    pub fn next_single_state(&self, s: &State, d: &Decision) -> State {
        let delta = match *d {
            Decision::End => 0.0,
            Decision::Travel(mode, dest) => {
                let o = self.zone_axis_index(&s.location);
                let dz = dest
                    .zone()
                    .unwrap_or_else(|| panic!("impossible state: simulating compressed travel"));
                let d_idx = self.world.require_index(dz);
                let mins = self.world.door_to_door_mins(mode, o, d_idx, s.time);
                self.cfg.grid.steps_of_mins(mins)
            }
            _ => self.cfg.grid.decision_step(s.time),
        };
        self.next_state(s, d, s.time + delta)
    }

    /// The inclusive integral-time anchor range of `(s, d)`.
    ///
    /// Travel spans `floor(t + minDur) ..= ceil(t + maxDur)` over the OD
    /// selection's duration bounds; other decisions bracket their single
    /// deterministic arrival time.  The upper end is clipped to DayLength; a
    /// returned `lo > hi` means no reachable anchor (the travel can only
    /// overshoot the day).
    pub fn anchor_times(&self, s: &State, d: &Decision) -> (u32, u32) {
        let day_len = self.cfg.grid.day_length();
        let (lo, hi) = match *d {
            Decision::End => (s.time.floor(), s.time.ceil()),
            Decision::Travel(mode, dest) => {
                let o = self.zone_axis(&s.location);
                let dd = self.zone_axis(&dest);
                let (lo_m, hi_m) = self.world.duration_bounds_mins(mode, o, dd);
                (
                    (s.time + self.cfg.grid.steps_of_mins(lo_m)).floor(),
                    (s.time + self.cfg.grid.steps_of_mins(hi_m)).ceil(),
                )
            }
            _ => {
                let arrive = s.time + self.cfg.grid.decision_step(s.time);
                (arrive.floor(), arrive.ceil())
            }
        };
        let lo = lo.max(0.0) as u32;
        let hi = (hi.max(0.0) as u32).min(day_len);
        (lo, hi)
    }

    /// The integral-timestep states reachable from `(s, d)` — the
    /// interpolation anchors the value function must have cached.
    pub fn next_integral_time_states(&self, s: &State, d: &Decision) -> Vec<State> {
        let (lo, hi) = self.anchor_times(s, d);
        (lo..=hi).map(|t| self.next_state(s, d, t as f64)).collect()
    }

    // ── Zone-axis helpers ─────────────────────────────────────────────────

    /// The world-space axis selector for a location.
    pub fn zone_axis(&self, loc: &Location) -> ZoneAxis {
        match loc.zone() {
            Some(z) => ZoneAxis::One(self.world.require_index(z)),
            None => ZoneAxis::All,
        }
    }

    /// World index of a concrete location.
    ///
    /// # Panics
    ///
    /// Panics on the all-zones wildcard.
    pub fn zone_axis_index(&self, loc: &Location) -> usize {
        match loc.zone() {
            Some(z) => self.world.require_index(z),
            None => panic!("impossible state: concrete zone required"),
        }
    }
}
