//! Command-line parsing for the Growth-at-Risk quantile fitter.
//!
//! Argument parsing and command dispatch stay separate from the modeling code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gar",
    version,
    about = "Growth-at-Risk quantile regression with local projections"
)]
pub struct Cli {
    /// Log per-fit detail (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a configuration file without touching any data.
    Validate(ValidateArgs),
    /// Transform features, fit the quantile panel and export the result tables.
    Fit(FitArgs),
    /// Write a synthetic monthly panel plus a matching configuration.
    Sample(SampleArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ValidateArgs {
    /// Configuration JSON.
    #[arg(short, long, value_name = "JSON")]
    pub config: PathBuf,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Configuration JSON.
    #[arg(short, long, value_name = "JSON")]
    pub config: PathBuf,

    /// Data CSV with a `date` column and one column per series.
    #[arg(short, long, value_name = "CSV")]
    pub data: PathBuf,

    /// Directory receiving one CSV per output table.
    #[arg(short, long, value_name = "DIR", default_value = "gar-output")]
    pub out_dir: PathBuf,

    /// Skip writing result tables; only print the summary.
    #[arg(long)]
    pub no_export: bool,

    /// Also print the per-fit diagnostics table.
    #[arg(long)]
    pub diagnostics: bool,

    /// IRLS iteration budget per fit.
    #[arg(long, default_value_t = 5000)]
    pub max_iter: usize,

    /// IRLS convergence tolerance on the largest coefficient change.
    #[arg(long, default_value_t = 1e-6)]
    pub tolerance: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Number of monthly rows.
    #[arg(short = 'n', long, default_value_t = 240)]
    pub rows: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output data CSV.
    #[arg(long, value_name = "CSV", default_value = "gar-sample.csv")]
    pub out: PathBuf,

    /// Output configuration JSON matching the sample.
    #[arg(long, value_name = "JSON", default_value = "gar-sample.json")]
    pub config_out: PathBuf,
}
