//! Command-line parsing for the wealth-tax microsimulation.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the simulation code. Every flag only overrides a `SimConfig` field;
//! anything not exposed here is set through the TOML config file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "wtsim", version, about = "Regional wealth-tax microsimulation")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "WTSIM_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synthesize the population, compute taxes and write results and diagnostics.
    Run(RunArgs),
    /// Evaluate the wealth-tax schedule of one region for a single taxable base.
    Tax(TaxArgs),
    /// Print the validated policy tables.
    Policy(PolicyArgs),
}

/// Options shared by every command that needs a configuration.
#[derive(Debug, Args, Clone, Default)]
pub struct ConfigArgs {
    /// TOML configuration file layered over the built-in defaults.
    #[arg(long, env = "WTSIM_CONFIG", value_name = "TOML")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Long-format band statistics CSV {category, element, statistic, value}.
    #[arg(long, env = "WTSIM_STATS", value_name = "CSV")]
    pub stats: PathBuf,

    /// Region population shares CSV {region, share}.
    #[arg(long, env = "WTSIM_SHARES", value_name = "CSV")]
    pub shares: PathBuf,

    /// Observed revenue CSV {region, total_revenue}.
    #[arg(long, env = "WTSIM_REVENUE", value_name = "CSV")]
    pub revenue: PathBuf,

    /// Taxpayer targets CSV {region, taxpayers}; replaces targets from the config file.
    #[arg(long, env = "WTSIM_TARGETS", value_name = "CSV")]
    pub targets: Option<PathBuf>,

    /// Directory for units.csv, regions.csv, revenue.csv and summary.json.
    #[arg(long, env = "WTSIM_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Master seed (stage seeds are derived from it).
    #[arg(long, env = "WTSIM_SEED")]
    pub seed: Option<u64>,

    /// Simulated adult population.
    #[arg(long)]
    pub population: Option<f64>,

    /// Average household size.
    #[arg(long)]
    pub household_size: Option<f64>,

    /// Net wealth above which a household may split.
    #[arg(long)]
    pub split_threshold: Option<f64>,

    /// Probability that an eligible household splits.
    #[arg(long)]
    pub split_prob: Option<f64>,

    /// Comma-separated target wealth shares per percentile bin, lowest first.
    #[arg(long, value_delimiter = ',')]
    pub target_shares: Option<Vec<f64>>,

    /// Skip percentile reweighting.
    #[arg(long)]
    pub no_reweight: bool,

    /// Skip Pareto tail injection.
    #[arg(long)]
    pub no_tail: bool,

    /// Multiply assets by each region's asset scale before taxation.
    #[arg(long)]
    pub region_scaling: bool,

    /// Disable dropout draws.
    #[arg(long)]
    pub no_dropout: bool,

    /// Disable migration draws.
    #[arg(long)]
    pub no_migration: bool,

    /// Do not print the text report.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TaxArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Region code (unknown regions use the default schedule).
    #[arg(long)]
    pub region: String,

    /// Taxable base in currency units.
    #[arg(long)]
    pub base: f64,
}

#[derive(Debug, Args, Clone)]
pub struct PolicyArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
