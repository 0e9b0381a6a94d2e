//! Shared test fixtures (feature `testkit`).
//!
//! Downstream crates enable this in their dev-dependencies to get a small
//! deterministic model without re-declaring LOS matrices in every test file.

use scaper_core::{Agent, ModelConfig, Param, ParamSet, PersonId, ZoneId, N_MODES};

use crate::network::{LosBlock, LosTables, N_PERIODS, PEAK};
use crate::{Model, PeakPeriods, ZoneTable};

/// A 3-zone model with distinguishable LOS values.
///
/// Off-peak time between zones `o` and `d` is `10 + |o−d|·10` minutes for
/// every mode; peak time is doubled for car and transit.  Transit adds 5
/// minutes wait and 3 minutes access.  Cost is a tenth of the off-peak time.
pub fn tiny_model() -> Model {
    let n = 3;
    let zones = ZoneTable::new(
        vec![100.0, 200.0, 0.0],
        vec![50.0, 0.0, 300.0],
        vec![1.2, 0.0, 2.4],
    );

    let mut blocks = Vec::new();
    for mode in 0..N_MODES {
        for period in 0..N_PERIODS {
            let mut time = vec![0.0; n * n];
            let mut wait = vec![0.0; n * n];
            let mut access = vec![0.0; n * n];
            let mut cost = vec![0.0; n * n];
            for o in 0..n {
                for d in 0..n {
                    let base = 10.0 + 10.0 * (o as f64 - d as f64).abs();
                    // Walk/bike carry the same data in both period slots.
                    let peaky = mode < 2 && period == PEAK;
                    time[o * n + d] = if peaky { base * 2.0 } else { base };
                    wait[o * n + d] = if mode == 1 { 5.0 } else { 0.0 };
                    access[o * n + d] = if mode == 1 { 3.0 } else { 0.0 };
                    cost[o * n + d] = base * 0.1;
                }
            }
            blocks.push(LosBlock { time, wait, access, cost });
        }
    }

    Model {
        config: ModelConfig::default(),
        peaks:  PeakPeriods::default(),
        zones,
        los:    LosTables::new(n, blocks),
    }
}

/// An agent living in zone 0, optionally working in `work`.
pub fn agent(work: Option<ZoneId>) -> Agent {
    Agent {
        id: PersonId(1),
        age: 40.0,
        female: false,
        income: 30_000.0,
        has_kids: false,
        home_zone: ZoneId(0),
        work_zone: work,
        owns_car: true,
        transit_card: false,
        weight: 1.0,
        work_duration: None,
    }
}

/// Build a parameter table from `(name, value, estimate)` triples.
pub fn params(n_classes: usize, entries: &[(&str, f64, bool)]) -> ParamSet {
    let map = entries
        .iter()
        .map(|&(name, value, estimate)| (name.to_string(), Param { value, estimate }))
        .collect();
    ParamSet::new(map, n_classes)
}
