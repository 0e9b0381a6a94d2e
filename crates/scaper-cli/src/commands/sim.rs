//! `scaper sim` — simulate one day path per agent.

use std::path::PathBuf;

use clap::Args;
use rayon::prelude::*;

use scaper_core::AgentRng;
use scaper_io::{RunKind, SharedTripSink, TripCsvWriter, TripRow};
use scaper_sim::{draw_class, path_to_trips, simulate_day};
use scaper_state::StateSpace;
use scaper_value::{EvCache, LinearUtility, WorkerCtx};
use scaper_world::World;

use crate::context::{agent_slice, thread_pool, ModelContext};
use crate::error::CliResult;
use crate::progress::Progress;

#[derive(Args)]
pub struct SimArgs {
    /// Maximum number of agents to simulate.
    #[arg(short = 't')]
    pub max_agents: Option<usize>,

    /// Zone sample size per agent; omit to compute over all zones.
    #[arg(short = 'z')]
    pub zone_sample: Option<usize>,

    /// Worker threads (default: all logical cores).
    #[arg(short = 'x')]
    pub parallelism: Option<usize>,

    /// Output file (default: the dated sim/ layout path).
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &ModelContext, args: SimArgs) -> CliResult<()> {
    let path = match args.output {
        Some(p) => p,
        None => ctx.layout.output_file(RunKind::Sim, "simulation", "csv")?,
    };
    let sink = SharedTripSink::new(TripCsvWriter::create(&path)?);

    let agents = agent_slice(&ctx.agents, args.max_agents);
    let progress = Progress::new(agents.len());
    let full_world = ctx.model.full_world();
    let day_len = ctx.model.config.grid.day_length() as usize;

    let pool = thread_pool(args.parallelism)?;
    pool.install(|| {
        agents
            .par_iter()
            .for_each_init(
                || WorkerCtx::new(day_len),
                |worker, agent| {
                    let mut rng = AgentRng::new(ctx.model.config.seed, agent.id);

                    // Sampled worlds are per-agent; the full world is shared.
                    let sampled: Option<World<'_>> = match args.zone_sample {
                        None => None,
                        Some(n) => {
                            let mut required = vec![agent.home_zone];
                            required.extend(agent.work_zone);
                            match World::sampled(
                                &ctx.model,
                                &ctx.params,
                                agent.home_zone,
                                &required,
                                n,
                                &mut rng,
                                &mut worker.bufs,
                            ) {
                                Ok(w) => Some(w),
                                Err(e) => {
                                    log::warn!("agent {}: {e}; skipped", agent.id);
                                    progress.failure();
                                    return;
                                }
                            }
                        }
                    };
                    let world = match &sampled {
                        Some(w) => w,
                        None => &full_world,
                    };

                    let space = StateSpace::new(&ctx.model.config, agent, world);
                    let class = draw_class(&LinearUtility, &ctx.params, agent, &mut rng);
                    let mut cache =
                        EvCache::new(day_len, world.num_zones(), f64::NEG_INFINITY);
                    let day = simulate_day(
                        space,
                        &LinearUtility,
                        &ctx.params,
                        class,
                        &mut cache,
                        worker,
                        &mut rng,
                    );
                    cache.dispose(&mut worker.bufs);

                    let rows: Vec<TripRow> = path_to_trips(agent.id, class, &day)
                        .iter()
                        .map(|t| TripRow::from_trip(t, &ctx.model.config.grid, world))
                        .collect();
                    if let Some(w) = sampled {
                        w.release_into(&mut worker.bufs);
                    }

                    match sink.append(&rows) {
                        Ok(()) => progress.success(),
                        Err(e) => {
                            log::warn!("agent {}: output error: {e}", agent.id);
                            progress.failure();
                        }
                    }
                },
            );
    });

    progress.finish("sim");
    sink.into_inner().finish()?;
    log::info!("wrote {}", path.display());
    Ok(())
}
