//! `scaper` — travel-behavior microsimulation and estimation.
//!
//! Five commands over one model folder:
//!
//! | Command    | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `sim`      | simulate day paths                                |
//! | `cs`       | generate estimation choicesets                    |
//! | `est`      | estimate utility (or zone-sampling) parameters    |
//! | `deriv`    | expected-value sensitivity sweeps                 |
//! | `obsToCsv` | re-emit observed trips in the output format       |

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod context;
mod error;
mod progress;

use context::ModelContext;
use error::CliResult;

// ── CLI surface ───────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "scaper", version, about = "Travel-behavior microsimulation engine")]
struct Cli {
    /// Model folder holding input/, sim/, cs/, est/, logs/.
    #[arg(short = 'm', long, global = true, default_value = "models/base")]
    model: PathBuf,

    /// Log progress to the console.
    #[arg(short = 'c', long, global = true)]
    console: bool,

    /// Write the log into the run's dated log file.
    #[arg(short = 'l', long = "logFile", global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate one day path per agent.
    Sim(commands::sim::SimArgs),
    /// Generate choicesets for estimation.
    Cs(commands::cs::CsArgs),
    /// Estimate parameters by maximum likelihood.
    Est(commands::est::EstArgs),
    /// Expected-value and travel-time sensitivity sweeps.
    Deriv(commands::deriv::DerivArgs),
    /// Re-emit observed trips in the simulation output format.
    #[command(name = "obsToCsv")]
    ObsToCsv(commands::obs::ObsArgs),
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    std::process::exit(match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{e}");
            eprintln!("scaper: {e}");
            1
        }
    });
}

fn run(cli: Cli) -> CliResult<()> {
    let layout = scaper_io::RunLayout::new(&cli.model);
    init_logger(&cli, &layout)?;
    let ctx = ModelContext::load(layout)?;
    log::info!(
        "model '{}': {} zones, {} agents, {} classes",
        cli.model.display(),
        ctx.model.zones.n,
        ctx.agents.len(),
        ctx.params.n_classes()
    );

    match cli.command {
        Command::Sim(args) => commands::sim::run(&ctx, args),
        Command::Cs(args) => commands::cs::run(&ctx, args),
        Command::Est(args) => commands::est::run(&ctx, args),
        Command::Deriv(args) => commands::deriv::run(&ctx, args),
        Command::ObsToCsv(args) => commands::obs::run(&ctx, args),
    }
}

/// Console and/or log-file logging.  With `--logFile` the log goes to the
/// run's dated file; otherwise to stderr (info with `--console`, warnings
/// only without).
fn init_logger(cli: &Cli, layout: &scaper_io::RunLayout) -> CliResult<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if cli.log_file {
        let path = layout.output_file(scaper_io::RunKind::Logs, "scaper", "log")?;
        let file = std::fs::File::create(&path)?;
        builder
            .filter_level(log::LevelFilter::Info)
            .target(env_logger::Target::Pipe(Box::new(file)));
        if cli.console {
            eprintln!("logging to {}", path.display());
        }
    } else if cli.console {
        builder.filter_level(log::LevelFilter::Info);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    let _ = builder.try_init();
    Ok(())
}
