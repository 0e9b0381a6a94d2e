//! Zone importance sampling.
//!
//! # Procedure
//!
//! 1. Score every zone with a destination-choice MNL (`sampling_probs`).
//! 2. Emit the agent's required zones first, then fill the remaining slots
//!    by independent draws **with replacement** (`sample_zones`).  Duplicate
//!    draws are kept: each duplicate slot is its own world column and the
//!    correction term already accounts for with-replacement sampling.
//! 3. Build `C[o,d] = −ln(N·p[zone[d]])` for `o ≠ d`, zero on the diagonal
//!    (`correction_matrix`).
//!
//! The probability vector depends only on the parameter table and the zone
//! data, so the same corrections can be rebuilt deterministically at
//! estimation time from a choiceset's stored zone list.

use scaper_core::{AgentRng, Mode, ParamSet, ZoneId};

use crate::{LosTables, WorldError, WorldResult, ZoneTable, OFF_PEAK};

/// Parameter names of the zone-sampling MNL.
pub const ZS_LOG_POP: &str = "zsLogPop";
pub const ZS_LOG_EMP: &str = "zsLogEmp";
pub const ZS_TIME: &str = "zsTime";

/// MNL selection probabilities over all zones, from the agent's home zone.
///
/// Utility per zone: `zsLogPop·ln(1+pop) + zsLogEmp·ln(1+emp) +
/// zsTime·carTime(home → zone)` (off-peak).  With an all-zero parameter
/// table this degenerates to the uniform distribution, which is still a
/// valid importance sampler.
pub fn sampling_probs(
    zones: &ZoneTable,
    los: &LosTables,
    params: &ParamSet,
    home: ZoneId,
) -> WorldResult<Vec<f64>> {
    let n = zones.n;
    let b_pop = params.shared_value(ZS_LOG_POP);
    let b_emp = params.shared_value(ZS_LOG_EMP);
    let b_time = params.shared_value(ZS_TIME);

    let car_off = los.block(Mode::Car, OFF_PEAK);
    let home_row = &car_off.time[home.index() * n..(home.index() + 1) * n];

    let mut utils: Vec<f64> = (0..n)
        .map(|z| b_pop * zones.log_pop[z] + b_emp * zones.log_emp[z] + b_time * home_row[z])
        .collect();

    // Stable softmax.
    let max = utils.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for u in &mut utils {
        *u = (*u - max).exp();
        total += *u;
    }
    if !(total > 0.0) || !total.is_finite() {
        return Err(WorldError::DegenerateSamplingModel);
    }
    for u in &mut utils {
        *u /= total;
    }
    Ok(utils)
}

/// Draw a zone sample of `n_sample` slots: required zones first (deduplicated,
/// order preserved), remaining slots filled with replacement from `probs`.
///
/// If the required set alone exceeds `n_sample`, the sample grows to fit it.
pub fn sample_zones(
    probs: &[f64],
    required: &[ZoneId],
    n_sample: usize,
    rng: &mut AgentRng,
) -> WorldResult<Vec<ZoneId>> {
    let mut zones: Vec<ZoneId> = Vec::with_capacity(n_sample);
    for &z in required {
        if z.index() >= probs.len() {
            return Err(WorldError::ZoneNotFound(z));
        }
        if !zones.contains(&z) {
            zones.push(z);
        }
    }

    // Cumulative distribution for inverse-CDF draws.
    let mut cdf = Vec::with_capacity(probs.len());
    let mut acc = 0.0;
    for &p in probs {
        acc += p;
        cdf.push(acc);
    }

    while zones.len() < n_sample {
        let u = rng.uniform_to(acc);
        let idx = cdf.partition_point(|&c| c <= u).min(probs.len() - 1);
        zones.push(ZoneId(idx as u32));
    }
    Ok(zones)
}

/// The `n_s × n_s` correction matrix for a sampled zone list.
///
/// `C[o,d] = −ln(N·p[zone[d]])` off the diagonal, 0 on it, where `N` is the
/// sample size and `p` the selection probability of the destination's zone.
pub fn correction_matrix(probs: &[f64], zones: &[ZoneId]) -> Vec<f64> {
    let n_s = zones.len();
    let mut c = vec![0.0; n_s * n_s];
    for d in 0..n_s {
        let corr = -((n_s as f64) * probs[zones[d].index()]).ln();
        for o in 0..n_s {
            if o != d {
                c[o * n_s + d] = corr;
            }
        }
    }
    c
}
