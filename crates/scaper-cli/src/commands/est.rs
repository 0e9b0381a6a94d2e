//! `scaper est` — maximum-likelihood estimation.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use scaper_core::RunRng;
use scaper_estimate::{
    latent_class_cost, maximize_restarts, zone_sampling_cost, BfgsOptions, CostFunction, Outcome,
    Termination,
};
use scaper_io::{load_choicesets_csv, ChoicesetFiles, EstimateWriter, RunKind};
use scaper_value::LinearUtility;

use crate::context::{thread_pool, ModelContext};
use crate::error::{CliError, CliResult};

#[derive(Args)]
pub struct EstArgs {
    /// Worker threads (default: all logical cores).
    #[arg(short = 'x')]
    pub parallelism: Option<usize>,

    /// Estimation restarts; later starts are randomized.
    #[arg(short = 'n', default_value_t = 1)]
    pub restarts: usize,

    /// Randomization spread of restarts (start ×= spread·U(0,1)).
    #[arg(long, default_value_t = 2.0)]
    pub spread: f64,

    /// Use a central-difference Hessian for the standard errors.
    #[arg(short = 'H', long = "numHessian")]
    pub numerical_hessian: bool,

    /// Directory of a prior `cs` run (choicesets.csv + zonesamples.csv).
    /// Required unless estimating the zone-sampling model.
    #[arg(long = "choicesets")]
    pub choicesets: Option<PathBuf>,

    /// Output file (default: the dated est/ layout path).
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub target: Option<EstTarget>,
}

#[derive(Subcommand)]
pub enum EstTarget {
    /// Estimate the zone-importance MNL from observed destinations.
    Zonesampling,
}

pub fn run(ctx: &ModelContext, args: EstArgs) -> CliResult<()> {
    let pool = thread_pool(args.parallelism)?;

    let cost: Box<dyn CostFunction> = match args.target {
        Some(EstTarget::Zonesampling) => {
            let trips: Vec<_> = ctx.observed.values().flatten().cloned().collect();
            Box::new(zone_sampling_cost(&ctx.model, &ctx.params, &ctx.agents, &trips)?)
        }
        None => {
            let dir = args.choicesets.as_ref().ok_or_else(|| {
                CliError::Usage("est needs --choicesets DIR (from a prior cs run)".into())
            })?;
            let sets = load_choicesets_csv(&ChoicesetFiles::in_dir(dir))?;
            log::info!("loaded {} choicesets from {}", sets.len(), dir.display());
            Box::new(latent_class_cost(
                &ctx.model,
                &LinearUtility,
                &ctx.params,
                &ctx.agents,
                &sets,
            )?)
        }
    };

    log::info!("estimating {} parameters", cost.dim());
    let options = BfgsOptions {
        numerical_hessian: args.numerical_hessian,
        ..Default::default()
    };
    let mut rng = RunRng::new(ctx.model.config.seed);
    let outcome =
        pool.install(|| maximize_restarts(cost.as_ref(), &options, args.restarts, args.spread, &mut rng));

    report(&outcome, cost.as_ref());

    let path = match args.output {
        Some(p) => p,
        None => ctx.layout.output_file(RunKind::Estimate, "estimates", "csv")?,
    };
    let mut writer = EstimateWriter::create(&path)?;
    writer.write_results(
        &ctx.params,
        cost.names(),
        outcome.theta.as_slice(),
        outcome.std_errors.as_slice(),
    )?;
    writer.finish()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn report(outcome: &Outcome, cost: &dyn CostFunction) {
    match &outcome.termination {
        Termination::Converged => {
            log::info!(
                "converged after {} iterations, log-likelihood {:.4}",
                outcome.iterations,
                outcome.value
            );
        }
        Termination::MaxIterations => {
            log::warn!("hit the iteration cap; reporting the best point found");
        }
        Termination::LineSearch(e) => {
            log::warn!("{e}; reporting the last finite point");
        }
        Termination::Numerical(msg) => {
            log::warn!("numerical failure: {msg}");
        }
    }
    for (i, name) in cost.names().iter().enumerate() {
        log::info!(
            "  {name} = {:.6} (se {:.6})",
            outcome.theta[i],
            outcome.std_errors[i]
        );
    }
}
