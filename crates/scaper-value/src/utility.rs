//! The pluggable utility specification.
//!
//! A `UtilitySpec` never computes numbers directly: it emits **named terms**
//! — `(parameter name, mat)` pairs — into a [`TermSink`].  The engine's sink
//! multiplies each part by the class's parameter value and accumulates; the
//! estimation sink instead collects the parts as coefficient rows over the
//! estimated parameter vector.  One specification therefore drives
//! simulation and estimation with identical utility definitions.

use rustc_hash::FxHashMap;

use scaper_core::{Activity, Agent, Mode, ParamSet};
use scaper_mat::Mat;
use scaper_state::{Decision, LocTag, State, StateSpace};
use scaper_world::Axis;

// ── TermSink ──────────────────────────────────────────────────────────────────

/// Receives the named terms of one decision (or class membership).
pub trait TermSink {
    /// Add the term `param(name) · part` to whatever this sink accumulates.
    fn term(&mut self, name: &str, part: &Mat<'_>);
}

/// The engine's sink: dots each term with the class's parameter value and
/// broadcasts it into the rented accumulator mat.
pub struct UtilityAccumulator<'a> {
    pub params: &'a ParamSet,
    pub class: usize,
    pub acc: &'a mut Mat<'static>,
}

impl TermSink for UtilityAccumulator<'_> {
    fn term(&mut self, name: &str, part: &Mat<'_>) {
        let k = self.params.value(self.class, name);
        if k != 0.0 {
            self.acc.add_scaled(part, k);
        }
    }
}

/// The estimation sink: splits each (necessarily scalar) term into a
/// coefficient on an estimated parameter or a fixed-utility contribution.
pub struct RowCollector<'a> {
    pub params: &'a ParamSet,
    pub class: usize,
    /// Estimated parameter key → θ index.
    pub index: &'a FxHashMap<String, usize>,
    pub row: &'a mut [f64],
    pub fixed: &'a mut f64,
}

impl TermSink for RowCollector<'_> {
    fn term(&mut self, name: &str, part: &Mat<'_>) {
        assert_eq!(
            part.data().len(),
            1,
            "shape mismatch: estimation rows need scalar terms, got {:?}",
            part.shape()
        );
        let v = part.scale * part.data()[0];
        match self.params.resolve(self.class, name) {
            Some((key, p)) => match self.index.get(&key) {
                Some(&i) if p.estimate => self.row[i] += v,
                _ => *self.fixed += p.value * v,
            },
            // Absent parameter: value 0, but let the table log it once.
            None => {
                let _ = self.params.value(self.class, name);
            }
        }
    }
}

// ── UtilitySpec ───────────────────────────────────────────────────────────────

/// Pluggable utility definition.
///
/// Implementations must be `Send + Sync`: the same specification instance is
/// shared by every worker thread.  Anything that varies per agent or per
/// state arrives through the arguments.
pub trait UtilitySpec: Send + Sync {
    /// Emit the named terms of the instantaneous utility `u(state, decision)`.
    ///
    /// Parts must be shaped for the decision's matrix form: broadcastable to
    /// `Scalar` for concrete states/destinations, `Row`/`Col`/`Full` when
    /// either axis carries the all-zones wildcard.
    fn decision_terms(
        &self,
        space: &StateSpace<'_, '_>,
        state: &State,
        decision: &Decision,
        sink: &mut dyn TermSink,
    );

    /// Emit the named terms of the class-membership utility of `class`.
    ///
    /// Class 0 is the baseline and should emit nothing.
    fn class_terms(&self, agent: &Agent, class: usize, sink: &mut dyn TermSink);
}

// ── LinearUtility ─────────────────────────────────────────────────────────────

/// The default linear-in-parameters utility.
///
/// | Decision        | Terms                                                           |
/// |-----------------|-----------------------------------------------------------------|
/// | `Continue`      | `dur<Act>` · step, `parkingCost` while a car sits off-home      |
/// | `Start(a)`      | `const<Act>`, plus `sizeLogPop`/`sizeLogEmp` at NonFixed places |
/// | `End`           | —                                                               |
/// | `Travel(m, d)`  | `time<Mode>`, `travelWait`, `travelAccess`, `travelCost`,       |
/// |                 | `asc<Mode>` (car is the base), `transitCardCost` for holders    |
///
/// Zone-sampling corrections are *not* terms: the engine adds them directly,
/// with coefficient 1, to NonFixed travel options.
pub struct LinearUtility;

impl LinearUtility {
    fn dur_name(a: Activity) -> &'static str {
        match a {
            Activity::Home  => "durHome",
            Activity::Work  => "durWork",
            Activity::Shop  => "durShop",
            Activity::Other => "durOther",
            Activity::Depart | Activity::Arrive => "durPhase",
        }
    }

    fn const_name(a: Activity) -> &'static str {
        match a {
            Activity::Home  => "constHome",
            Activity::Work  => "constWork",
            Activity::Shop  => "constShop",
            Activity::Other => "constOther",
            Activity::Depart | Activity::Arrive => "constPhase",
        }
    }

    fn time_name(m: Mode) -> &'static str {
        match m {
            Mode::Car     => "timeCar",
            Mode::Transit => "timeTransit",
            Mode::Walk    => "timeWalk",
            Mode::Bike    => "timeBike",
        }
    }

    fn asc_name(m: Mode) -> Option<&'static str> {
        match m {
            Mode::Car     => None, // base mode
            Mode::Transit => Some("ascTransit"),
            Mode::Walk    => Some("ascWalk"),
            Mode::Bike    => Some("ascBike"),
        }
    }
}

impl UtilitySpec for LinearUtility {
    fn decision_terms(
        &self,
        space: &StateSpace<'_, '_>,
        state: &State,
        decision: &Decision,
        sink: &mut dyn TermSink,
    ) {
        match *decision {
            Decision::Continue => {
                let steps = space.cfg.grid.decision_step(state.time);
                sink.term(Self::dur_name(state.activity), &Mat::scalar(steps));

                // A car parked away from home keeps costing by the minute.
                if state.vehicle == scaper_core::Vehicle::Car
                    && state.location.tag() != LocTag::Residence
                {
                    let mut rate = space
                        .world
                        .parking_rate(space.zone_axis(&state.location), Axis::Origin);
                    rate.scale_by(steps * space.cfg.grid.timestep_mins);
                    sink.term("parkingCost", &rate);
                }
            }

            Decision::Start(a) => {
                sink.term(Self::const_name(a), &Mat::scalar(1.0));
                if state.location.tag() == LocTag::NonFixed {
                    let axis = space.zone_axis(&state.location);
                    sink.term("sizeLogPop", &space.world.log_pop(axis, Axis::Origin));
                    sink.term("sizeLogEmp", &space.world.log_emp(axis, Axis::Origin));
                }
            }

            Decision::End => {}

            Decision::Travel(mode, dest) => {
                let o = space.zone_axis(&state.location);
                let d = space.zone_axis(&dest);
                let t = state.time;
                let world = space.world;

                let mut parts = Vec::with_capacity(2);
                world.travel_time(mode, o, d, t, &mut parts);
                for p in &parts {
                    sink.term(Self::time_name(mode), p);
                }

                parts.clear();
                world.travel_wait(mode, o, d, t, &mut parts);
                for p in &parts {
                    sink.term("travelWait", p);
                }

                parts.clear();
                world.travel_access(mode, o, d, t, &mut parts);
                for p in &parts {
                    sink.term("travelAccess", p);
                }

                parts.clear();
                world.travel_cost(mode, o, d, t, &mut parts);
                for p in &parts {
                    sink.term("travelCost", p);
                    if mode == Mode::Transit && space.agent.transit_card {
                        sink.term("transitCardCost", p);
                    }
                }

                if let Some(name) = Self::asc_name(mode) {
                    sink.term(name, &Mat::scalar(1.0));
                }
            }
        }
    }

    fn class_terms(&self, agent: &Agent, class: usize, sink: &mut dyn TermSink) {
        if class == 0 {
            return; // baseline class
        }
        sink.term("cmConst", &Mat::scalar(1.0));
        sink.term("cmAge", &Mat::scalar(agent.age));
        sink.term("cmFemale", &Mat::scalar(agent.female as u8 as f64));
        sink.term("cmIncome", &Mat::scalar(agent.income));
        sink.term("cmKids", &Mat::scalar(agent.has_kids as u8 as f64));
    }
}
