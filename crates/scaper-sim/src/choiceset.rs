//! Choice-set generation for estimation.
//!
//! # Procedure (per agent with observed trips)
//!
//! 1. Collect the required zones (home, workplace, every observed trip end)
//!    and build the world — importance-sampled when a sample size is set.
//! 2. Map the observed trips back to a day path; infeasible observations are
//!    recoverable errors, the agent is skipped.
//! 3. Compute `V̄(start | class)` per latent class under this world.
//! 4. Attach to every alternative path ζ the sampling correction
//!    `−ln Σ_c P(c) · exp(U(ζ|c) − V̄(start|c))` — minus the log of its
//!    class-averaged conditional choice probability.
//! 5. Simulate N alternative paths, observed-first, and fold duplicates:
//!    a cluster of k identical journeys keeps one entry with `+ ln k` on its
//!    correction.

use scaper_core::{Agent, AgentRng, ParamSet, PersonId, ZoneId};
use scaper_state::{DayPath, StateSpace};
use scaper_value::{EvCache, UtilitySpec, ValueEngine, WorkerCtx};
use scaper_world::{Model, World};

use crate::simulate::{class_probabilities, draw_class, simulate_day};
use crate::trips::{path_to_trips, path_utility, same_journeys, trips_to_path, Trip};
use crate::{SimError, SimResult};

// ── Types ─────────────────────────────────────────────────────────────────────

/// One alternative of a choiceset: a trip list plus its sampling correction.
#[derive(Clone, Debug)]
pub struct Alternative {
    pub trips: Vec<Trip>,
    pub correction: f64,
}

/// The estimation record of one agent: the observed alternative at index 0,
/// sampled alternatives after it.
#[derive(Clone, Debug)]
pub struct Choiceset {
    pub person: PersonId,
    /// The world's zone sample, in world-index order.  Empty means the
    /// choiceset was generated over the full-zone world.
    pub zones: Vec<ZoneId>,
    pub alternatives: Vec<Alternative>,
}

/// Knobs of the generator.
#[derive(Clone, Debug)]
pub struct ChoicesetOptions {
    /// Simulated alternatives per agent.
    pub n_alternatives: usize,
    /// Zone sample size; `None` computes over all zones.
    pub zone_sample: Option<usize>,
}

impl Default for ChoicesetOptions {
    fn default() -> Self {
        Self { n_alternatives: 500, zone_sample: None }
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// Build one agent's choiceset.
///
/// Errors with [`SimError::InfeasibleObservation`] when the observed trips
/// cannot be replayed as a feasible day path; the caller logs and skips.
pub fn build_choiceset(
    model: &Model,
    utility: &dyn UtilitySpec,
    params: &ParamSet,
    agent: &Agent,
    observed: &[Trip],
    options: &ChoicesetOptions,
    ctx: &mut WorkerCtx,
    rng: &mut AgentRng,
) -> SimResult<Choiceset> {
    // ── World over the required zones ─────────────────────────────────────
    let mut required = vec![agent.home_zone];
    required.extend(agent.work_zone);
    for trip in observed {
        required.push(trip.origin);
        required.push(trip.dest);
    }

    let world: World<'_> = match options.zone_sample {
        Some(n) => World::sampled(
            model,
            params,
            agent.home_zone,
            &required,
            n,
            rng,
            &mut ctx.bufs,
        )?,
        None => model.full_world(),
    };
    let space = StateSpace::new(&model.config, agent, &world);

    // ── Observed path ─────────────────────────────────────────────────────
    let observed_path = trips_to_path(&space, observed)
        .ok_or(SimError::InfeasibleObservation(agent.id))?;

    // ── Per-class start values ────────────────────────────────────────────
    let day_len = model.config.grid.day_length() as usize;
    let n_classes = params.n_classes();
    let mut caches: Vec<EvCache> = (0..n_classes)
        .map(|_| EvCache::new(day_len, world.num_zones(), f64::NEG_INFINITY))
        .collect();

    let mut start_values = Vec::with_capacity(n_classes);
    for (class, cache) in caches.iter_mut().enumerate() {
        let mut engine = ValueEngine::new(space, utility, params, class, cache, ctx);
        let start = engine.space.start_state();
        start_values.push(engine.state_value(&start));
    }
    let class_probs = class_probabilities(utility, params, agent);

    let correction_of = |path: &DayPath| -> f64 {
        let mut avg = 0.0;
        for class in 0..n_classes {
            let u = path_utility(&space, utility, params, class, path);
            avg += class_probs[class] * (u - start_values[class]).exp();
        }
        -avg.ln()
    };

    // ── Observed-first alternative list ───────────────────────────────────
    let mut alternatives = Vec::with_capacity(options.n_alternatives + 1);
    alternatives.push(Alternative {
        trips: path_to_trips(agent.id, 0, &observed_path),
        correction: correction_of(&observed_path),
    });

    for _ in 0..options.n_alternatives {
        let class = draw_class(utility, params, agent, rng);
        let path = simulate_day(space, utility, params, class, &mut caches[class], ctx, rng);
        alternatives.push(Alternative {
            trips: path_to_trips(agent.id, class, &path),
            correction: correction_of(&path),
        });
    }

    // ── Duplicate folding ─────────────────────────────────────────────────
    let alternatives = fold_duplicates(alternatives);

    // ── Cleanup ───────────────────────────────────────────────────────────
    for mut cache in caches {
        cache.dispose(&mut ctx.bufs);
    }
    let zones = if world.is_sampled() { world.zone_ids().to_vec() } else { Vec::new() };
    world.release_into(&mut ctx.bufs);

    Ok(Choiceset { person: agent.id, zones, alternatives })
}

/// Collapse equal-journey alternatives, adding `ln k` to the survivor's
/// correction for each cluster of size `k`.  Order (observed first) is
/// preserved.
pub(crate) fn fold_duplicates(alternatives: Vec<Alternative>) -> Vec<Alternative> {
    let mut folded: Vec<(Alternative, usize)> = Vec::new();
    for alt in alternatives {
        match folded
            .iter_mut()
            .find(|(kept, _)| same_journeys(&kept.trips, &alt.trips))
        {
            Some((_, count)) => *count += 1,
            None => folded.push((alt, 1)),
        }
    }
    folded
        .into_iter()
        .map(|(mut alt, count)| {
            if count > 1 {
                alt.correction += (count as f64).ln();
            }
            alt
        })
        .collect()
}
