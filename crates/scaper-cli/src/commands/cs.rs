//! `scaper cs` — generate estimation choicesets.

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Args;
use rayon::prelude::*;

use scaper_core::AgentRng;
use scaper_io::{write_choicesets_csv, ChoicesetFiles, RunKind};
use scaper_sim::{build_choiceset, Choiceset, ChoicesetOptions, SimError};
use scaper_value::{LinearUtility, WorkerCtx};

use crate::context::{agent_slice, thread_pool, ModelContext};
use crate::error::CliResult;
use crate::progress::Progress;

#[derive(Args)]
pub struct CsArgs {
    /// Maximum number of agents.
    #[arg(short = 't')]
    pub max_agents: Option<usize>,

    /// Zone sample size per agent; omit to compute over all zones.
    #[arg(short = 'z')]
    pub zone_sample: Option<usize>,

    /// Worker threads (default: all logical cores).
    #[arg(short = 'x')]
    pub parallelism: Option<usize>,

    /// Simulated alternatives per agent.
    #[arg(short = 'a', default_value_t = 500)]
    pub alternatives: usize,

    /// Output directory (default: the dated cs/ layout path).
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &ModelContext, args: CsArgs) -> CliResult<()> {
    let out_dir = match args.output {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => ctx.layout.output_dir(RunKind::Choiceset)?,
    };

    let agents = agent_slice(&ctx.agents, args.max_agents);
    // Only agents with observed trips produce a choiceset.
    let observed_agents: Vec<_> = agents
        .iter()
        .filter(|a| ctx.observed.contains_key(&a.id))
        .collect();
    log::info!(
        "{} of {} agents have observed trips",
        observed_agents.len(),
        agents.len()
    );

    let options = ChoicesetOptions {
        n_alternatives: args.alternatives,
        zone_sample: args.zone_sample,
    };
    let day_len = ctx.model.config.grid.day_length() as usize;
    let progress = Progress::new(observed_agents.len());
    let results: Mutex<Vec<Choiceset>> = Mutex::new(Vec::with_capacity(observed_agents.len()));

    let pool = thread_pool(args.parallelism)?;
    pool.install(|| {
        observed_agents.par_iter().for_each_init(
            || WorkerCtx::new(day_len),
            |worker, agent| {
                let mut rng = AgentRng::new(ctx.model.config.seed, agent.id);
                let trips = &ctx.observed[&agent.id];
                match build_choiceset(
                    &ctx.model,
                    &LinearUtility,
                    &ctx.params,
                    agent,
                    trips,
                    &options,
                    worker,
                    &mut rng,
                ) {
                    Ok(cs) => {
                        results.lock().unwrap().push(cs);
                        progress.success();
                    }
                    Err(e @ SimError::InfeasibleObservation(_)) => {
                        log::warn!("{e}");
                        progress.failure();
                    }
                    Err(e) => {
                        log::warn!("agent {}: {e}; skipped", agent.id);
                        progress.failure();
                    }
                }
            },
        );
    });

    progress.finish("cs");
    let sets = results.into_inner().unwrap();
    let files = ChoicesetFiles::in_dir(&out_dir);
    write_choicesets_csv(&files, &sets)?;
    log::info!("wrote {} choicesets to {}", sets.len(), out_dir.display());
    Ok(())
}
