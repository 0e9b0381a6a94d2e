//! Latent-class draw and day-path sampling.

use scaper_core::{Agent, AgentRng, ParamSet};
use scaper_mat::{Mat, Shape};
use scaper_state::{DayPath, Feasibility, StateSpace};
use scaper_value::{EvCache, UtilityAccumulator, UtilitySpec, ValueEngine, WorkerCtx};

// ── Class membership ──────────────────────────────────────────────────────────

/// Class-membership probabilities: softmax over the class utilities emitted
/// by [`UtilitySpec::class_terms`].  Class 0 is the zero-utility baseline.
pub fn class_probabilities(utility: &dyn UtilitySpec, params: &ParamSet, agent: &Agent) -> Vec<f64> {
    let n = params.n_classes();
    let mut utils = Vec::with_capacity(n);
    for class in 0..n {
        let mut acc = Mat::zeros(Shape::Scalar);
        {
            let mut sink = UtilityAccumulator { params, class, acc: &mut acc };
            utility.class_terms(agent, class, &mut sink);
        }
        utils.push(acc.value(0, 0));
    }

    let max = utils.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for u in &mut utils {
        *u = (*u - max).exp();
        total += *u;
    }
    for u in &mut utils {
        *u /= total;
    }
    utils
}

/// Draw a latent class for one agent.
pub fn draw_class(
    utility: &dyn UtilitySpec,
    params: &ParamSet,
    agent: &Agent,
    rng: &mut AgentRng,
) -> usize {
    if params.n_classes() == 1 {
        return 0;
    }
    let probs = class_probabilities(utility, params, agent);
    rng.draw_index(&probs)
}

// ── Day-path sampling ─────────────────────────────────────────────────────────

/// Simulate one agent's day under an already-drawn latent class.
///
/// Walks from the start state, computing exploded option utilities at each
/// `Good` state and drawing by inverse CDF over the (scaled) Φ values.
///
/// # Panics
///
/// Panics on a `Bad` state or a zero-mass option set — both are engine bugs,
/// not data conditions (see the crate docs).
pub fn simulate_day(
    space: StateSpace<'_, '_>,
    utility: &dyn UtilitySpec,
    params: &ParamSet,
    class: usize,
    cache: &mut EvCache,
    ctx: &mut WorkerCtx,
    rng: &mut AgentRng,
) -> DayPath {
    let mut engine = ValueEngine::new(space, utility, params, class, cache, ctx);
    let mut steps = Vec::new();
    let mut s = engine.space.start_state();

    loop {
        match engine.space.classify(&s) {
            Feasibility::End => return DayPath { steps, terminal: s },
            Feasibility::Bad => {
                panic!("impossible state: simulation reached a Bad state: {s:?}")
            }
            Feasibility::Good => {
                let mut options = Vec::new();
                engine.option_utilities(&s, true, &mut options);

                let weights: Vec<f64> = options.iter().map(|(_, phi)| phi.sum()).collect();
                let total: f64 = weights.iter().sum();
                assert!(
                    total > 0.0 && total.is_finite(),
                    "impossible state: zero or non-finite choice mass at {s:?}"
                );

                let chosen = rng.draw_index(&weights);
                let decision = options[chosen].0;
                for (_, phi) in options {
                    engine.release(phi);
                }

                steps.push((s, decision));
                s = engine.space.next_single_state(&s, &decision);
            }
        }
    }
}
