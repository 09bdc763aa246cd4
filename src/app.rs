//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments and builds the run configuration
//! - reads the input tables
//! - runs the simulation pipeline
//! - prints the report and writes the outputs

use std::path::Path;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Command, ConfigArgs, PolicyArgs, RunArgs, TaxArgs};
use crate::domain::SimConfig;
use crate::error::AppError;
use crate::tax::policy::{TaxPolicy, normalize_region};

pub mod pipeline;

pub const UNITS_FILE: &str = "units.csv";
pub const REGIONS_FILE: &str = "regions.csv";
pub const REVENUE_FILE: &str = "revenue.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Entry point for the `wtsim` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `wtsim --stats ...` behaves like `wtsim run --stats ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Tax(args) => handle_tax(args),
        Command::Policy(args) => handle_policy(args),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second initialization (tests, embedding) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn base_config(args: &ConfigArgs) -> Result<SimConfig, AppError> {
    match &args.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            SimConfig::from_toml_file(path)
        }
        None => Ok(SimConfig::default()),
    }
}

/// Layer CLI overrides (and the optional targets table) over the base configuration.
pub fn sim_config_from_args(args: &RunArgs) -> Result<SimConfig, AppError> {
    let mut config = base_config(&args.config)?;

    if let Some(seed) = args.seed {
        config.seeds.master = seed;
    }
    if let Some(n) = args.population {
        config.population.total_population = n;
    }
    if let Some(size) = args.household_size {
        config.population.avg_household_size = size;
    }
    if let Some(threshold) = args.split_threshold {
        config.expansion.threshold = threshold;
    }
    if let Some(p) = args.split_prob {
        config.expansion.split_prob = p;
    }
    if let Some(shares) = &args.target_shares {
        config.calibration.reweight.bins = shares.len();
        config.calibration.reweight.target_shares = shares.clone();
    }
    if args.no_reweight {
        config.calibration.reweight.enabled = false;
    }
    if args.no_tail {
        config.calibration.tail.enabled = false;
    }
    if args.region_scaling {
        config.calibration.region_scaling = true;
    }
    if args.no_dropout {
        config.behavior.dropout.enabled = false;
    }
    if args.no_migration {
        config.behavior.migration.enabled = false;
    }
    if let Some(path) = &args.targets {
        config.taxpayer_targets = crate::io::read_taxpayer_targets(path)?;
    }

    config.validate()?;
    Ok(config)
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = sim_config_from_args(&args)?;

    let inputs = pipeline::RunInputs {
        stats: crate::io::read_stat_rows(&args.stats)?,
        shares: crate::io::read_region_shares(&args.shares)?,
        observed: crate::io::read_observed_revenue(&args.revenue)?,
    };
    let run = pipeline::run_simulation(&config, &inputs)?;

    if !args.quiet {
        println!("{}", crate::report::format_run_summary(&run.summary));
    }

    write_outputs(&args.out_dir, &run, &config)
}

fn write_outputs(out_dir: &Path, run: &pipeline::RunOutput, config: &SimConfig) -> Result<(), AppError> {
    std::fs::create_dir_all(out_dir).map_err(|e| {
        AppError::new(2, format!("Failed to create output directory '{}': {e}", out_dir.display()))
    })?;
    crate::io::write_results_csv(&out_dir.join(UNITS_FILE), &run.results)?;
    crate::io::write_region_summary_csv(&out_dir.join(REGIONS_FILE), &run.summary.regions)?;
    crate::io::write_revenue_csv(&out_dir.join(REVENUE_FILE), &run.summary.revenue)?;
    crate::io::write_summary_json(&out_dir.join(SUMMARY_FILE), &run.summary, config)?;
    Ok(())
}

fn load_policy(args: &ConfigArgs) -> Result<TaxPolicy, AppError> {
    let config = base_config(args)?;
    TaxPolicy::from_config(&config.policy)
}

fn handle_tax(args: TaxArgs) -> Result<(), AppError> {
    if !(args.base.is_finite() && args.base >= 0.0) {
        return Err(AppError::configuration("--base must be a finite, non-negative amount."));
    }
    let policy = load_policy(&args.config)?;
    let region = normalize_region(&args.region);
    policy.resolve_regions([region.as_str()]);
    println!("{}", crate::report::format_tax_quote(&policy, &region, args.base));
    Ok(())
}

fn handle_policy(args: PolicyArgs) -> Result<(), AppError> {
    let policy = load_policy(&args.config)?;
    print!("{}", crate::report::format_policy(&policy));
    Ok(())
}

/// Rewrite argv so a bare flag list defaults to `wtsim run`.
///
/// Rules:
/// - `wtsim --stats a.csv ...`      -> `wtsim run --stats a.csv ...`
/// - `wtsim --help/--version/-h`    -> unchanged (show top-level help/version)
/// - `wtsim <subcommand> ...`       -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}
