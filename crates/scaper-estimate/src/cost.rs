//! The estimation cost functions.
//!
//! Both the latent-class path MNL and the zone-sampling destination MNL
//! reduce to the same observation layout: per class, a variable matrix over
//! alternatives (chosen alternative in row 0) plus fixed utilities, and a
//! class-membership row.  [`MnlCost`] evaluates log-likelihood, gradient,
//! and the weighted score outer-product matrix with a Rayon reduction over
//! observations.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use scaper_core::{AgentSet, Mode, ParamSet};
use scaper_sim::{trips_to_path, Choiceset};
use scaper_state::{Decision, LocTag, StateSpace};
use scaper_value::{RowCollector, UtilitySpec};
use scaper_world::{Model, World, OFF_PEAK};

use crate::{EstimateError, EstimateResult};

// ── CostFunction ──────────────────────────────────────────────────────────────

/// The value/gradient/score bundle of one evaluation.
pub struct Evaluation {
    pub value: f64,
    pub grad: DVector<f64>,
    /// `Σ_i w_i (g_i − ḡ)(g_i − ḡ)ᵀ` — the robust ("sandwich") middle.
    pub score: DMatrix<f64>,
}

/// What the BFGS driver optimizes.  `Sync` because evaluations fan out over
/// Rayon internally and the driver itself may be called from worker threads.
pub trait CostFunction: Sync {
    fn dim(&self) -> usize;
    /// Estimated parameter names, in θ order.
    fn names(&self) -> &[String];
    /// The starting point (parameter-file values).
    fn start(&self) -> DVector<f64>;
    /// Evaluate at θ.  Values may be non-finite (the line search handles
    /// infeasible steps); they must never panic.
    fn eval(&self, theta: &DVector<f64>) -> Evaluation;
}

// ── Observations ──────────────────────────────────────────────────────────────

/// One observation, pre-computed against the estimated-parameter layout.
#[derive(Debug)]
struct Observation {
    weight: f64,
    /// Per class: membership variable row (K) and fixed membership utility.
    class_rows: Vec<DVector<f64>>,
    class_fixed: Vec<f64>,
    /// Per class: alternatives × K variable matrix, chosen alternative first.
    choice_rows: Vec<DMatrix<f64>>,
    /// Per class: fixed utility per alternative (includes corrections).
    choice_fixed: Vec<DVector<f64>>,
}

impl Observation {
    /// Observation log-likelihood and its gradient at θ.
    fn log_lik_grad(&self, theta: &DVector<f64>) -> (f64, DVector<f64>) {
        let k = theta.len();
        let n_classes = self.class_rows.len();

        // Class-membership probabilities.
        let mut cu: Vec<f64> = (0..n_classes)
            .map(|c| self.class_rows[c].dot(theta) + self.class_fixed[c])
            .collect();
        softmax(&mut cu);

        // Conditional choice probabilities per class.
        let mut lik = 0.0;
        let mut posterior = vec![0.0; n_classes];
        let mut cond: Vec<DVector<f64>> = Vec::with_capacity(n_classes);
        for c in 0..n_classes {
            let mut v: Vec<f64> = (&self.choice_rows[c] * theta + &self.choice_fixed[c])
                .iter()
                .cloned()
                .collect();
            softmax(&mut v);
            lik += cu[c] * v[0];
            posterior[c] = cu[c] * v[0];
            cond.push(DVector::from_vec(v));
        }

        if !(lik > 0.0) || !lik.is_finite() {
            return (f64::NEG_INFINITY, DVector::zeros(k));
        }
        for p in &mut posterior {
            *p /= lik;
        }

        // Membership mean row under the class probabilities.
        let mut x_bar = DVector::zeros(k);
        for c in 0..n_classes {
            x_bar.axpy(cu[c], &self.class_rows[c], 1.0);
        }

        let mut grad = DVector::zeros(k);
        for c in 0..n_classes {
            // Choice mean row under the conditional probabilities.
            let m_bar = self.choice_rows[c].tr_mul(&cond[c]);
            let mut g_c = self.choice_rows[c].row(0).transpose() - m_bar;
            g_c += &self.class_rows[c] - &x_bar;
            grad.axpy(posterior[c], &g_c, 1.0);
        }

        (lik.ln(), grad)
    }
}

/// In-place stable softmax.
fn softmax(v: &mut [f64]) {
    let max = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        total += *x;
    }
    for x in v.iter_mut() {
        *x /= total;
    }
}

// ── MnlCost ───────────────────────────────────────────────────────────────────

/// The assembled cost function over all observations.
#[derive(Debug)]
pub struct MnlCost {
    names: Vec<String>,
    start: DVector<f64>,
    observations: Vec<Observation>,
}

impl CostFunction for MnlCost {
    fn dim(&self) -> usize {
        self.names.len()
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn start(&self) -> DVector<f64> {
        self.start.clone()
    }

    fn eval(&self, theta: &DVector<f64>) -> Evaluation {
        let k = theta.len();

        // Per-observation log-likelihoods and gradients, in parallel.
        let per_obs: Vec<(f64, DVector<f64>)> = self
            .observations
            .par_iter()
            .map(|obs| obs.log_lik_grad(theta))
            .collect();

        let mut value = 0.0;
        let mut grad = DVector::zeros(k);
        let mut weight_total = 0.0;
        for (obs, (ll, g)) in self.observations.iter().zip(&per_obs) {
            value += obs.weight * ll;
            grad.axpy(obs.weight, g, 1.0);
            weight_total += obs.weight;
        }

        // Weighted score outer products around the weighted mean gradient.
        let mut score = DMatrix::zeros(k, k);
        if value.is_finite() && weight_total > 0.0 {
            let g_mean = &grad / weight_total;
            for (obs, (_, g)) in self.observations.iter().zip(&per_obs) {
                let centered = g - &g_mean;
                score.ger(obs.weight, &centered, &centered, 1.0);
            }
        }

        Evaluation { value, grad, score }
    }
}

impl MnlCost {
    fn check_coverage(self) -> EstimateResult<Self> {
        let k = self.names.len();
        let mut used = vec![false; k];
        for obs in &self.observations {
            for row in &obs.class_rows {
                for i in 0..k {
                    used[i] |= row[i] != 0.0;
                }
            }
            for m in &obs.choice_rows {
                for i in 0..k {
                    used[i] |= m.column(i).iter().any(|v| *v != 0.0);
                }
            }
        }
        let missing: Vec<String> = self
            .names
            .iter()
            .zip(&used)
            .filter(|&(_, &u)| !u)
            .map(|(n, _)| n.clone())
            .collect();
        if missing.is_empty() {
            Ok(self)
        } else {
            Err(EstimateError::MissingEstimatedParameters(missing))
        }
    }
}

// ── Latent-class path MNL builder ─────────────────────────────────────────────

/// Assemble the latent-class path MNL from serialized choicesets.
///
/// Observations whose agent is unknown or whose trips no longer replay under
/// the rebuilt world are skipped with a warning (they were feasible at
/// generation time; a changed model can invalidate them).
pub fn latent_class_cost(
    model: &Model,
    utility: &dyn UtilitySpec,
    params: &ParamSet,
    agents: &AgentSet,
    choicesets: &[Choiceset],
) -> EstimateResult<MnlCost> {
    let names = params.estimated_names();
    let index: FxHashMap<String, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();
    let k = names.len();
    let n_classes = params.n_classes();

    let mut bufs = scaper_mat::BufPool::new();
    let mut observations = Vec::with_capacity(choicesets.len());

    'obs: for cs in choicesets {
        let Some(agent) = agents.by_id(cs.person) else {
            log::warn!("choiceset references unknown agent {}; skipped", cs.person);
            continue;
        };

        let world: World<'_> = if cs.zones.is_empty() {
            model.full_world()
        } else {
            World::resampled(model, params, agent.home_zone, cs.zones.clone(), &mut bufs)?
        };
        let space = StateSpace::new(&model.config, agent, &world);

        // Class-membership rows.
        let mut class_rows = Vec::with_capacity(n_classes);
        let mut class_fixed = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let mut row = vec![0.0; k];
            let mut fixed = 0.0;
            {
                let mut sink = RowCollector {
                    params,
                    class,
                    index: &index,
                    row: &mut row,
                    fixed: &mut fixed,
                };
                utility.class_terms(agent, class, &mut sink);
            }
            class_rows.push(DVector::from_vec(row));
            class_fixed.push(fixed);
        }

        // Choice rows per class.
        let n_alts = cs.alternatives.len();
        let mut choice_rows = Vec::with_capacity(n_classes);
        let mut choice_fixed = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let mut rows = DMatrix::zeros(n_alts, k);
            let mut fixed = DVector::zeros(n_alts);
            for (a, alternative) in cs.alternatives.iter().enumerate() {
                let Some(path) = trips_to_path(&space, &alternative.trips) else {
                    log::warn!(
                        "agent {}: alternative {a} no longer replays; choiceset skipped",
                        cs.person
                    );
                    continue 'obs;
                };

                let mut row = vec![0.0; k];
                let mut fixed_u = alternative.correction;
                for (state, decision) in &path.steps {
                    {
                        let mut sink = RowCollector {
                            params,
                            class,
                            index: &index,
                            row: &mut row,
                            fixed: &mut fixed_u,
                        };
                        utility.decision_terms(&space, state, decision, &mut sink);
                    }
                    // Sampling corrections enter the fixed part, exactly as
                    // the engine adds them to option utilities.
                    if let Decision::Travel(_, dest) = decision {
                        if dest.tag() == LocTag::NonFixed && space.world.is_sampled() {
                            let o = space.zone_axis(&state.location);
                            let d = space.zone_axis(dest);
                            fixed_u += space.world.corrections(o, d).value(0, 0);
                        }
                    }
                }
                for (i, v) in row.iter().enumerate() {
                    rows[(a, i)] = *v;
                }
                fixed[a] = fixed_u;
            }
            choice_rows.push(rows);
            choice_fixed.push(fixed);
        }

        observations.push(Observation {
            weight: agent.weight,
            class_rows,
            class_fixed,
            choice_rows,
            choice_fixed,
        });
    }

    if observations.is_empty() {
        return Err(EstimateError::NoObservations);
    }

    let start = DVector::from_iterator(k, names.iter().map(|n| {
        // Estimated keys exist by construction; resolve never misses here.
        params.resolve(0, n).map(|(_, p)| p.value).unwrap_or(0.0)
    }));

    MnlCost { names, start, observations }.check_coverage()
}

// ── Zone-sampling destination MNL builder ─────────────────────────────────────

/// Assemble the destination-choice MNL that calibrates the zone importance
/// sampler: one observation per observed trip, the chosen destination first,
/// all zones as alternatives.
pub fn zone_sampling_cost(
    model: &Model,
    params: &ParamSet,
    agents: &AgentSet,
    trips: &[scaper_sim::Trip],
) -> EstimateResult<MnlCost> {
    let names = params.estimated_names();
    let index: FxHashMap<String, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();
    let k = names.len();
    let n = model.zones.n;
    let car_off = model.los.block(Mode::Car, OFF_PEAK);

    let variables = [
        (scaper_world::sample::ZS_LOG_POP, &model.zones.log_pop),
        (scaper_world::sample::ZS_LOG_EMP, &model.zones.log_emp),
    ];

    let mut observations = Vec::with_capacity(trips.len());
    for trip in trips {
        let weight = agents.by_id(trip.person).map_or(1.0, |a| a.weight);
        let chosen = trip.dest.index();
        let origin = trip.origin.index();
        if chosen >= n || origin >= n {
            log::warn!("trip of agent {} references an unknown zone; skipped", trip.person);
            continue;
        }

        // Chosen-first ordering over all zones.
        let order: Vec<usize> =
            std::iter::once(chosen).chain((0..n).filter(|&z| z != chosen)).collect();

        let mut rows = DMatrix::zeros(n, k);
        for (r, &z) in order.iter().enumerate() {
            for (name, column) in &variables {
                if let Some(&i) = index.get(*name) {
                    rows[(r, i)] = column[z];
                }
            }
            if let Some(&i) = index.get(scaper_world::sample::ZS_TIME) {
                rows[(r, i)] = car_off.time[origin * n + z];
            }
        }

        observations.push(Observation {
            weight,
            class_rows: vec![DVector::zeros(k)],
            class_fixed: vec![0.0],
            choice_rows: vec![rows],
            choice_fixed: vec![DVector::zeros(n)],
        });
    }

    if observations.is_empty() {
        return Err(EstimateError::NoObservations);
    }

    let start = DVector::from_iterator(k, names.iter().map(|n| {
        params.resolve(0, n).map(|(_, p)| p.value).unwrap_or(0.0)
    }));

    MnlCost { names, start, observations }.check_coverage()
}
