//! `scaper obsToCsv` — re-emit observed trips in the simulation output
//! format, with travel and arrival times derived from LOS.

use std::path::PathBuf;

use clap::Args;

use scaper_io::{RunKind, TripCsvWriter, TripRow};

use crate::context::{agent_slice, ModelContext};
use crate::error::CliResult;

#[derive(Args)]
pub struct ObsArgs {
    /// Maximum number of agents.
    #[arg(short = 't')]
    pub max_agents: Option<usize>,

    /// Output file (default: the dated sim/ layout path).
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &ModelContext, args: ObsArgs) -> CliResult<()> {
    let path = match args.output {
        Some(p) => p,
        None => ctx.layout.output_file(RunKind::Sim, "observed", "csv")?,
    };
    let mut writer = TripCsvWriter::create(&path)?;
    let world = ctx.model.full_world();

    let mut rows = 0usize;
    for agent in agent_slice(&ctx.agents, args.max_agents) {
        let Some(trips) = ctx.observed.get(&agent.id) else {
            continue;
        };
        for trip in trips {
            writer.write_row(&TripRow::from_trip(trip, &ctx.model.config.grid, &world))?;
            rows += 1;
        }
    }
    writer.finish()?;
    log::info!("wrote {rows} observed trips to {}", path.display());
    Ok(())
}
