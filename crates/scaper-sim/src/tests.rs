//! Simulation, conversion, and choiceset tests.

use scaper_core::{Activity, Mode, ModelConfig, N_MODES, PersonId, TimeGrid, ZoneId};
use scaper_state::{Decision, Feasibility, Location, StateSpace};
use scaper_value::{EvCache, LinearUtility, ValueEngine, WorkerCtx};
use scaper_world::network::{LosBlock, LosTables, N_PERIODS};
use scaper_world::testkit::{agent, params, tiny_model};
use scaper_world::{Model, PeakPeriods, ZoneTable};

use crate::trips::{same_journeys, Trip};
use crate::{path_to_trips, path_utility, simulate_day, trips_to_path};

/// A 2-zone walk-only model on a 6-step hour grid where every travel lasts a
/// whole number of steps, so value interpolation is exact and the path MNL
/// telescopes without error.
fn exact_model() -> Model {
    let n = 2;
    let mut blocks = Vec::new();
    for _mode in 0..N_MODES {
        for _period in 0..N_PERIODS {
            let mut time = vec![0.0; n * n];
            let cost = vec![1.0; n * n];
            for o in 0..n {
                for d in 0..n {
                    // Intrazonal 60 min, interzonal 120 min: 1 or 2 steps.
                    time[o * n + d] = 60.0 * (1.0 + (o as f64 - d as f64).abs());
                }
            }
            blocks.push(LosBlock {
                time,
                wait: vec![0.0; n * n],
                access: vec![0.0; n * n],
                cost,
            });
        }
    }

    let mut config = ModelConfig::default();
    config.grid = TimeGrid {
        day_start_hour: 5,
        day_end_hour: 11,
        timestep_mins: 60.0,
        decision_steps: 1,
    };
    config.modes.no_car_modes = vec![Mode::Walk];
    config.activities.discretionary = vec![Activity::Shop];

    Model {
        config,
        peaks: PeakPeriods::default(),
        zones: ZoneTable::new(vec![100.0, 200.0], vec![10.0, 20.0], vec![0.0, 0.0]),
        los: LosTables::new(n, blocks),
    }
}

fn walk_trip(person: PersonId, activity: Activity, origin: u32, dest: u32, depart: f64) -> Trip {
    Trip {
        person,
        class: 0,
        activity,
        mode: Mode::Walk,
        origin: ZoneId(origin),
        dest: ZoneId(dest),
        depart_time: depart,
    }
}

#[cfg(test)]
mod conversion {
    use super::*;

    #[test]
    fn trips_to_path_to_trips_is_identity() {
        let model = tiny_model();
        let a = agent(None);
        let world = model.full_world();
        let space = StateSpace::new(&model.config, &a, &world);

        let observed = vec![
            walk_trip(a.id, Activity::Shop, 0, 1, 6.0),
            walk_trip(a.id, Activity::Home, 1, 0, 30.0),
        ];
        let path = trips_to_path(&space, &observed).expect("feasible observation");
        assert_eq!(space.classify(&path.terminal), Feasibility::End);

        let rederived = path_to_trips(a.id, 0, &path);
        assert!(same_journeys(&observed, &rederived));
    }

    #[test]
    fn every_state_on_a_replayed_path_is_good() {
        let model = tiny_model();
        let a = agent(None);
        let world = model.full_world();
        let space = StateSpace::new(&model.config, &a, &world);

        let observed = vec![
            walk_trip(a.id, Activity::Other, 0, 2, 12.0),
            walk_trip(a.id, Activity::Home, 2, 0, 48.0),
        ];
        let path = trips_to_path(&space, &observed).unwrap();
        for (s, _) in &path.steps {
            assert_eq!(space.classify(s), Feasibility::Good, "bad state {s:?}");
        }
    }

    #[test]
    fn wrong_origin_is_infeasible() {
        let model = tiny_model();
        let a = agent(None);
        let world = model.full_world();
        let space = StateSpace::new(&model.config, &a, &world);

        // The agent starts at home in zone 0; claiming a departure from
        // zone 2 contradicts the walk.
        let observed = vec![walk_trip(a.id, Activity::Shop, 2, 1, 6.0)];
        assert!(trips_to_path(&space, &observed).is_none());
    }

    #[test]
    fn day_not_ending_at_home_is_infeasible() {
        let model = tiny_model();
        let a = agent(None);
        let world = model.full_world();
        let space = StateSpace::new(&model.config, &a, &world);

        // One-way trip: the day ends at a Shop, which never classifies End.
        let observed = vec![walk_trip(a.id, Activity::Shop, 0, 1, 6.0)];
        assert!(trips_to_path(&space, &observed).is_none());
    }
}

#[cfg(test)]
mod simulation {
    use super::*;

    fn sim_params() -> scaper_core::ParamSet {
        params(
            1,
            &[
                ("durHome", 0.2, false),
                ("durShop", 0.4, false),
                ("durOther", 0.3, false),
                ("durWork", 0.6, false),
                ("constShop", 0.2, false),
                ("constOther", 0.1, false),
                ("constWork", 1.0, false),
                ("constHome", 0.1, false),
                ("timeCar", -0.03, false),
                ("timeWalk", -0.05, false),
                ("timeBike", -0.04, false),
                ("timeTransit", -0.03, false),
                ("travelCost", -0.01, false),
            ],
        )
    }

    /// Path validity: every simulated state classifies Good, the terminal
    /// classifies End.
    #[test]
    fn simulated_paths_are_valid() {
        let model = tiny_model();
        let a = agent(None);
        let world = model.full_world();
        let table = sim_params();
        let day_len = model.config.grid.day_length() as usize;
        let space = StateSpace::new(&model.config, &a, &world);

        let mut cache = EvCache::new(day_len, 3, f64::NEG_INFINITY);
        let mut ctx = WorkerCtx::new(day_len);
        let mut rng = scaper_core::AgentRng::new(11, a.id);
        let path = simulate_day(space, &LinearUtility, &table, 0, &mut cache, &mut ctx, &mut rng);

        assert!(!path.steps.is_empty());
        for (s, _) in &path.steps {
            assert_eq!(space.classify(s), Feasibility::Good);
        }
        assert_eq!(space.classify(&path.terminal), Feasibility::End);
    }

    /// Forced work (S2): a mandated 48-timestep workday, tracked in 4-step
    /// decision units, must appear in full on every simulated path.
    #[test]
    fn mandated_work_day_shows_up_whole() {
        let mut model = tiny_model();
        model.config.grid.decision_steps = 4;
        let mut a = agent(Some(ZoneId(1)));
        a.work_duration = Some(48); // 8 h at 10-minute steps = 12 decision units

        let world = model.full_world();
        let table = sim_params();
        let day_len = model.config.grid.day_length() as usize;
        let space = StateSpace::new(&model.config, &a, &world);

        let mut cache = EvCache::new(day_len, 3, f64::NEG_INFINITY);
        let mut ctx = WorkerCtx::new(day_len);
        let mut rng = scaper_core::AgentRng::new(23, a.id);
        let path = simulate_day(space, &LinearUtility, &table, 0, &mut cache, &mut ctx, &mut rng);

        assert!(path.terminal.has_worked);
        let travels_to_work = path.steps.iter().any(|(_, d)| {
            matches!(d, Decision::Travel(_, Location::Workplace(z)) if *z == ZoneId(1))
        });
        assert!(travels_to_work, "no travel to the workplace in {path:?}");

        // The mandate spans 12 four-step units; starting work consumes the
        // first, so at least 11 Continue decisions follow.
        let work_continues = path
            .steps
            .iter()
            .filter(|(s, d)| s.activity == Activity::Work && matches!(d, Decision::Continue))
            .count();
        assert!(
            work_continues >= 11,
            "only {work_continues} work continues for a 48-timestep mandate"
        );
    }

    /// Reproducibility: the same seed yields the same path.
    #[test]
    fn same_seed_same_path() {
        let model = tiny_model();
        let a = agent(None);
        let world = model.full_world();
        let table = sim_params();
        let day_len = model.config.grid.day_length() as usize;
        let space = StateSpace::new(&model.config, &a, &world);

        let mut run = || {
            let mut cache = EvCache::new(day_len, 3, f64::NEG_INFINITY);
            let mut ctx = WorkerCtx::new(day_len);
            let mut rng = scaper_core::AgentRng::new(77, a.id);
            simulate_day(space, &LinearUtility, &table, 0, &mut cache, &mut ctx, &mut rng)
        };
        assert_eq!(run(), run());
    }
}

#[cfg(test)]
mod path_mnl {
    use super::*;
    use scaper_state::{DayPath, State};

    /// Enumerate every feasible day path of the exact model.
    fn enumerate_paths(
        space: &StateSpace<'_, '_>,
        s: State,
        steps: &mut Vec<(State, Decision)>,
        out: &mut Vec<DayPath>,
    ) {
        match space.classify(&s) {
            Feasibility::Bad => {}
            Feasibility::End => out.push(DayPath { steps: steps.clone(), terminal: s }),
            Feasibility::Good => {
                let mut opts = Vec::new();
                space.options(&s, true, &mut opts);
                for d in opts {
                    let next = space.next_single_state(&s, &d);
                    steps.push((s, d));
                    enumerate_paths(space, next, steps, out);
                    steps.pop();
                }
            }
        }
    }

    /// The probability of a specific path as the product of per-step MNL
    /// draws, using the engine's exploded option utilities.
    fn product_probability(engine: &mut ValueEngine<'_, '_>, path: &DayPath) -> f64 {
        let mut p = 1.0;
        for (s, chosen) in &path.steps {
            let mut opts = Vec::new();
            engine.option_utilities(s, true, &mut opts);
            let total: f64 = opts.iter().map(|(_, phi)| phi.sum()).sum();
            let mut weight = f64::NAN;
            for (d, phi) in opts {
                if d == *chosen {
                    weight = phi.sum();
                }
                engine.release(phi);
            }
            p *= weight / total;
        }
        p
    }

    /// S5: full-enumeration MNL over paths equals the simulator's per-step
    /// product distribution when travel times are integral.
    #[test]
    fn path_probabilities_match_product_form() {
        let model = exact_model();
        let mut a = agent(None);
        a.owns_car = false;
        let table = params(
            1,
            &[
                ("durHome", 0.3, false),
                ("durShop", 0.8, false),
                ("timeWalk", -0.02, false),
                ("constShop", 0.5, false),
                ("constHome", 0.1, false),
                ("travelCost", -0.05, false),
                ("sizeLogPop", 0.1, false),
                ("sizeLogEmp", 0.1, false),
            ],
        );
        let world = model.full_world();
        let day_len = model.config.grid.day_length() as usize;
        let space = StateSpace::new(&model.config, &a, &world);
        let mut cache = EvCache::new(day_len, 2, f64::NEG_INFINITY);
        let mut ctx = WorkerCtx::new(day_len);
        let mut engine =
            ValueEngine::new(space, &LinearUtility, &table, 0, &mut cache, &mut ctx);

        let mut paths = Vec::new();
        let start = space.start_state();
        enumerate_paths(&space, start, &mut Vec::new(), &mut paths);
        assert!(paths.len() > 3, "expected a non-trivial path set");

        // Enumeration weights: exp(U(ζ)) normalized over all feasible paths.
        let utilities: Vec<f64> = paths
            .iter()
            .map(|p| path_utility(&space, &LinearUtility, &table, 0, p))
            .collect();
        let denom: f64 = utilities.iter().map(|u| u.exp()).sum();

        let mut total_product = 0.0;
        for (path, u) in paths.iter().zip(&utilities) {
            let enumerated = u.exp() / denom;
            let product = product_probability(&mut engine, path);
            total_product += product;
            assert!(
                (enumerated - product).abs() < 1e-9,
                "path {path:?}: enumeration {enumerated} vs product {product}"
            );
        }
        assert!((total_product - 1.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod choicesets {
    use super::*;
    use crate::{build_choiceset, ChoicesetOptions};
    use scaper_core::AgentRng;

    fn cs_params() -> scaper_core::ParamSet {
        params(
            1,
            &[
                ("durHome", 0.2, false),
                ("durShop", 0.4, false),
                ("durOther", 0.3, false),
                ("constShop", 0.2, false),
                ("constOther", 0.1, false),
                ("constHome", 0.1, false),
                ("timeCar", -0.03, false),
                ("timeWalk", -0.05, false),
                ("timeBike", -0.04, false),
                ("timeTransit", -0.03, false),
                ("travelCost", -0.01, false),
            ],
        )
    }

    #[test]
    fn observed_alternative_comes_first() {
        let model = tiny_model();
        let a = agent(None);
        let table = cs_params();
        let observed = vec![
            walk_trip(a.id, Activity::Shop, 0, 1, 6.0),
            walk_trip(a.id, Activity::Home, 1, 0, 30.0),
        ];
        let day_len = model.config.grid.day_length() as usize;
        let mut ctx = WorkerCtx::new(day_len);
        let mut rng = AgentRng::new(5, a.id);
        let cs = build_choiceset(
            &model,
            &LinearUtility,
            &table,
            &a,
            &observed,
            &ChoicesetOptions { n_alternatives: 10, zone_sample: None },
            &mut ctx,
            &mut rng,
        )
        .unwrap();

        assert_eq!(cs.person, a.id);
        assert!(cs.zones.is_empty(), "full-zone runs store no sample");
        assert!(same_journeys(&cs.alternatives[0].trips, &observed));
        assert!(cs.alternatives.len() <= 11);
        for alt in &cs.alternatives {
            assert!(alt.correction.is_finite());
        }
    }

    /// S8-flavored: with one class, the observed correction is exactly
    /// `V̄(start) − U(observed)` — minus the observed path's log probability.
    #[test]
    fn observed_correction_is_minus_log_probability() {
        let model = tiny_model();
        let a = agent(None);
        let table = cs_params();
        let observed = vec![
            walk_trip(a.id, Activity::Shop, 0, 1, 6.0),
            walk_trip(a.id, Activity::Home, 1, 0, 30.0),
        ];
        let day_len = model.config.grid.day_length() as usize;
        let mut ctx = WorkerCtx::new(day_len);
        let mut rng = AgentRng::new(5, a.id);
        let cs = build_choiceset(
            &model,
            &LinearUtility,
            &table,
            &a,
            &observed,
            &ChoicesetOptions { n_alternatives: 0, zone_sample: None },
            &mut ctx,
            &mut rng,
        )
        .unwrap();

        let world = model.full_world();
        let space = StateSpace::new(&model.config, &a, &world);
        let path = trips_to_path(&space, &observed).unwrap();
        let u = path_utility(&space, &LinearUtility, &table, 0, &path);

        let mut cache = EvCache::new(day_len, 3, f64::NEG_INFINITY);
        let mut ctx2 = WorkerCtx::new(day_len);
        let mut engine =
            ValueEngine::new(space, &LinearUtility, &table, 0, &mut cache, &mut ctx2);
        let v0 = engine.state_value(&space.start_state());

        let expected = v0 - u;
        assert!(
            (cs.alternatives[0].correction - expected).abs() < 1e-9,
            "correction {} vs V̄ − U = {expected}",
            cs.alternatives[0].correction
        );
    }

    #[test]
    fn infeasible_observation_is_recoverable() {
        let model = tiny_model();
        let a = agent(None);
        let table = cs_params();
        // Departure from the wrong zone cannot be replayed.
        let observed = vec![walk_trip(a.id, Activity::Shop, 2, 1, 6.0)];
        let day_len = model.config.grid.day_length() as usize;
        let mut ctx = WorkerCtx::new(day_len);
        let mut rng = AgentRng::new(5, a.id);
        let err = build_choiceset(
            &model,
            &LinearUtility,
            &table,
            &a,
            &observed,
            &ChoicesetOptions { n_alternatives: 1, zone_sample: None },
            &mut ctx,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, crate::SimError::InfeasibleObservation(_)));
    }

    #[test]
    fn duplicates_fold_with_log_count() {
        use crate::choiceset::{fold_duplicates, Alternative};
        let alt = |depart: f64, correction: f64| Alternative {
            trips: vec![walk_trip(PersonId(1), Activity::Shop, 0, 1, depart)],
            correction,
        };
        let folded = fold_duplicates(vec![
            alt(6.0, 1.0),
            alt(7.0, 2.0),
            alt(6.0, 1.0),
            alt(6.0, 1.0),
        ]);
        assert_eq!(folded.len(), 2);
        assert!((folded[0].correction - (1.0 + 3.0f64.ln())).abs() < 1e-12);
        assert_eq!(folded[1].correction, 2.0);
    }
}
