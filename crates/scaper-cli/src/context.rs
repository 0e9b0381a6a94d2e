//! The loaded model context — owned by `main`, passed to workers by
//! reference.  No global mutable state.

use std::collections::BTreeMap;
use std::path::Path;

use scaper_core::{AgentSet, ModelConfig, ParamSet, PersonId, TimeGrid};
use scaper_io::loader::{self, InputFiles};
use scaper_io::RunLayout;
use scaper_sim::Trip;
use scaper_world::{Model, PeakPeriods};

use crate::error::CliResult;

/// Everything a command needs: data, parameters, observed trips, run layout.
pub struct ModelContext {
    pub model: Model,
    pub agents: AgentSet,
    pub observed: BTreeMap<PersonId, Vec<Trip>>,
    pub params: ParamSet,
    pub layout: RunLayout,
}

impl ModelContext {
    pub fn load(layout: RunLayout) -> CliResult<ModelContext> {
        let files = InputFiles::in_dir(&layout.input_dir());

        let params = loader::load_params_csv(&files.parameters)?;
        let config = config_from_params(&params);
        let zones = loader::load_zones_csv(&files.zones)?;
        let los = loader::load_network_csv(&files.network, zones.n)?;
        let agents = loader::load_agents_csv(&files.agents, zones.n)?;
        let observed = loader::load_trips_csv(&files.trips, &config.grid)?;

        let model = Model {
            config,
            peaks: PeakPeriods::default(),
            zones,
            los,
        };
        Ok(ModelContext { model, agents, observed, params, layout })
    }
}

/// Model configuration knobs hidden in the parameter file.  Anything absent
/// keeps its default; `contains` guards avoid missing-name warnings for
/// these optional entries.
fn config_from_params(params: &ParamSet) -> ModelConfig {
    let mut config = ModelConfig::default();
    let mut grid = TimeGrid::default();
    let get = |name: &str, fallback: f64| -> f64 {
        if params.contains(name) { params.shared_value(name) } else { fallback }
    };
    grid.day_start_hour = get("dayStartHour", grid.day_start_hour as f64) as u32;
    grid.day_end_hour = get("dayEndHour", grid.day_end_hour as f64) as u32;
    grid.timestep_mins = get("timestepMins", grid.timestep_mins);
    grid.decision_steps = get("decisionSteps", grid.decision_steps as f64) as u32;
    config.grid = grid;
    config.seed = get("seed", 2024.0) as u64;
    config
}

/// Build the Rayon worker pool for `-x` (default: all logical cores).
pub fn thread_pool(parallelism: Option<usize>) -> CliResult<rayon::ThreadPool> {
    let threads = parallelism.unwrap_or_else(num_cpus::get);
    Ok(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?)
}

/// The first `limit` agents (`-t`), or all of them.
pub fn agent_slice(agents: &AgentSet, limit: Option<usize>) -> &[scaper_core::Agent] {
    match limit {
        Some(n) => &agents.agents[..n.min(agents.len())],
        None => &agents.agents,
    }
}
