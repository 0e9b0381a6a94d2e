//! `scaper deriv` — expected-value sensitivity sweeps.
//!
//! Sweeps a model input over a `min delta max` grid and reports the
//! per-agent, per-class expected value of the start state at every grid
//! point:
//!
//! - `--tt` scales all in-vehicle travel times by the grid value;
//! - `--wd` overrides the mandated work duration (timesteps).
//!
//! `--numDeriv` adds central-difference derivatives (travel-time sweep
//! only; work durations are integers), `--sim` additionally simulates one
//! day per grid point and reports its trip count and total travel minutes.

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Args;
use rayon::prelude::*;

use scaper_core::{Agent, AgentRng};
use scaper_io::RunKind;
use scaper_sim::simulate_day;
use scaper_state::StateSpace;
use scaper_value::{EvCache, LinearUtility, ValueEngine, WorkerCtx};
use scaper_world::World;

use crate::context::{agent_slice, thread_pool, ModelContext};
use crate::error::{CliError, CliResult};
use crate::progress::Progress;

#[derive(Args)]
pub struct DerivArgs {
    /// Maximum number of agents.
    #[arg(short = 't')]
    pub max_agents: Option<usize>,

    /// Zone sample size per agent; omit to compute over all zones.
    #[arg(short = 'z')]
    pub zone_sample: Option<usize>,

    /// Worker threads (default: all logical cores).
    #[arg(short = 'x')]
    pub parallelism: Option<usize>,

    /// Travel-time scale sweep: min delta max.
    #[arg(long = "tt", num_args = 3, value_names = ["MIN", "DELTA", "MAX"])]
    pub tt: Option<Vec<f64>>,

    /// Mandated work-duration sweep (timesteps): min delta max.
    #[arg(long = "wd", num_args = 3, value_names = ["MIN", "DELTA", "MAX"])]
    pub wd: Option<Vec<f64>>,

    /// Add central-difference derivatives (travel-time sweep).
    #[arg(long = "numDeriv")]
    pub num_deriv: bool,

    /// Simulate one day per grid point and report trip statistics.
    #[arg(long = "sim")]
    pub simulate: bool,

    /// Output file (default: the dated sim/ layout path).
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,
}

struct Row {
    person: u32,
    class: usize,
    sweep: &'static str,
    at: f64,
    ev: f64,
    deriv: Option<f64>,
    trips: Option<usize>,
    travel_mins: Option<f64>,
}

pub fn run(ctx: &ModelContext, args: DerivArgs) -> CliResult<()> {
    let tt_grid = args.tt.as_deref().map(grid_points).transpose()?;
    let wd_grid = args.wd.as_deref().map(grid_points).transpose()?;
    if tt_grid.is_none() && wd_grid.is_none() {
        return Err(CliError::Usage("deriv needs --tt and/or --wd".into()));
    }

    let path = match args.output {
        Some(p) => p,
        None => ctx.layout.output_file(RunKind::Sim, "deriv", "csv")?,
    };
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "person", "class", "sweep", "at", "ev", "ev_deriv", "trips", "travel_mins",
    ])?;
    let writer = Mutex::new(writer);

    let agents = agent_slice(&ctx.agents, args.max_agents);
    let progress = Progress::new(agents.len());
    let day_len = ctx.model.config.grid.day_length() as usize;
    let n_classes = ctx.params.n_classes();

    let pool = thread_pool(args.parallelism)?;
    pool.install(|| {
        agents.par_iter().for_each_init(
            || WorkerCtx::new(day_len),
            |worker, agent| {
                let mut rows = Vec::new();
                let mut rng = AgentRng::new(ctx.model.config.seed, agent.id);

                for class in 0..n_classes {
                    if let Some(grid) = &tt_grid {
                        for &scale in grid {
                            let tt_delta = args.tt.as_ref().map(|g| g[1]).unwrap_or(0.0);
                            let ev =
                                start_value(ctx, agent, agent, class, scale, args.zone_sample, worker, &mut rng);
                            let deriv = (args.num_deriv && tt_delta > 0.0).then(|| {
                                let hi = start_value(
                                    ctx, agent, agent, class, scale + tt_delta,
                                    args.zone_sample, worker, &mut rng,
                                );
                                let lo = start_value(
                                    ctx, agent, agent, class, scale - tt_delta,
                                    args.zone_sample, worker, &mut rng,
                                );
                                (hi - lo) / (2.0 * tt_delta)
                            });
                            let (trips, travel_mins) = if args.simulate {
                                let stats = simulate_stats(
                                    ctx, agent, agent, class, scale, args.zone_sample, worker, &mut rng,
                                );
                                (Some(stats.0), Some(stats.1))
                            } else {
                                (None, None)
                            };
                            rows.push(Row {
                                person: agent.id.0,
                                class,
                                sweep: "ttScale",
                                at: scale,
                                ev,
                                deriv,
                                trips,
                                travel_mins,
                            });
                        }
                    }

                    if let Some(grid) = &wd_grid {
                        for &duration in grid {
                            let mut varied = agent.clone();
                            varied.work_duration = Some(duration.round().max(1.0) as u32);
                            let ev = start_value(
                                ctx, agent, &varied, class, 1.0, args.zone_sample, worker, &mut rng,
                            );
                            let (trips, travel_mins) = if args.simulate {
                                let stats = simulate_stats(
                                    ctx, agent, &varied, class, 1.0, args.zone_sample, worker, &mut rng,
                                );
                                (Some(stats.0), Some(stats.1))
                            } else {
                                (None, None)
                            };
                            rows.push(Row {
                                person: agent.id.0,
                                class,
                                sweep: "workDuration",
                                at: duration,
                                ev,
                                deriv: None,
                                trips,
                                travel_mins,
                            });
                        }
                    }
                }

                let mut w = writer.lock().unwrap();
                for row in rows {
                    let result = w.write_record(&[
                        row.person.to_string(),
                        row.class.to_string(),
                        row.sweep.to_string(),
                        format!("{}", row.at),
                        format!("{}", row.ev),
                        row.deriv.map(|d| format!("{d}")).unwrap_or_default(),
                        row.trips.map(|t| t.to_string()).unwrap_or_default(),
                        row.travel_mins.map(|m| format!("{m:.1}")).unwrap_or_default(),
                    ]);
                    if let Err(e) = result {
                        log::warn!("agent {}: output error: {e}", row.person);
                    }
                }
                drop(w);
                progress.success();
            },
        );
    });

    progress.finish("deriv");
    writer.into_inner().unwrap().flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Expand `min delta max` into grid points.
fn grid_points(spec: &[f64]) -> CliResult<Vec<f64>> {
    let &[min, delta, max] = spec else {
        return Err(CliError::Usage("sweep needs exactly min delta max".into()));
    };
    if delta <= 0.0 || max < min {
        return Err(CliError::Usage(format!("bad sweep grid {min} {delta} {max}")));
    }
    let mut points = Vec::new();
    let mut v = min;
    while v <= max + 1e-9 {
        points.push(v);
        v += delta;
    }
    Ok(points)
}

/// Build the (per-call) world at a travel-time scale and agent variant.
fn world_at<'m>(
    ctx: &'m ModelContext,
    base: &Agent,
    scale: f64,
    zone_sample: Option<usize>,
    worker: &mut WorkerCtx,
    rng: &mut AgentRng,
) -> Option<World<'m>> {
    let mut world = match zone_sample {
        None => ctx.model.full_world(),
        Some(n) => {
            let mut required = vec![base.home_zone];
            required.extend(base.work_zone);
            match World::sampled(
                &ctx.model,
                &ctx.params,
                base.home_zone,
                &required,
                n,
                rng,
                &mut worker.bufs,
            ) {
                Ok(w) => w,
                Err(e) => {
                    log::warn!("agent {}: {e}", base.id);
                    return None;
                }
            }
        }
    };
    world.set_tt_scale(scale);
    Some(world)
}

#[allow(clippy::too_many_arguments)]
fn start_value(
    ctx: &ModelContext,
    base: &Agent,
    varied: &Agent,
    class: usize,
    scale: f64,
    zone_sample: Option<usize>,
    worker: &mut WorkerCtx,
    rng: &mut AgentRng,
) -> f64 {
    let Some(world) = world_at(ctx, base, scale, zone_sample, worker, rng) else {
        return f64::NAN;
    };
    let day_len = ctx.model.config.grid.day_length() as usize;
    let space = StateSpace::new(&ctx.model.config, varied, &world);
    let mut cache = EvCache::new(day_len, world.num_zones(), f64::NEG_INFINITY);
    let value = {
        let mut engine = ValueEngine::new(
            space,
            &LinearUtility,
            &ctx.params,
            class,
            &mut cache,
            worker,
        );
        let start = engine.space.start_state();
        engine.state_value(&start)
    };
    cache.dispose(&mut worker.bufs);
    world.release_into(&mut worker.bufs);
    value
}

/// One simulated day's (trip count, total door-to-door minutes).
#[allow(clippy::too_many_arguments)]
fn simulate_stats(
    ctx: &ModelContext,
    base: &Agent,
    varied: &Agent,
    class: usize,
    scale: f64,
    zone_sample: Option<usize>,
    worker: &mut WorkerCtx,
    rng: &mut AgentRng,
) -> (usize, f64) {
    let Some(world) = world_at(ctx, base, scale, zone_sample, worker, rng) else {
        return (0, f64::NAN);
    };
    let day_len = ctx.model.config.grid.day_length() as usize;
    let space = StateSpace::new(&ctx.model.config, varied, &world);
    let mut cache = EvCache::new(day_len, world.num_zones(), f64::NEG_INFINITY);
    let day = simulate_day(
        space,
        &LinearUtility,
        &ctx.params,
        class,
        &mut cache,
        worker,
        rng,
    );
    cache.dispose(&mut worker.bufs);

    let trips = scaper_sim::path_to_trips(varied.id, class, &day);
    let total_mins: f64 = trips
        .iter()
        .map(|t| {
            let o = world.require_index(t.origin);
            let d = world.require_index(t.dest);
            world.door_to_door_mins(t.mode, o, d, t.depart_time)
        })
        .sum();
    let n = trips.len();
    world.release_into(&mut worker.bufs);
    (n, total_mins)
}
