//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main:
//! - parses CLI arguments and installs logging
//! - loads configuration and data
//! - runs the pipeline and prints the report
//! - writes result tables

use std::fs::File;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, FitArgs, SampleArgs, ValidateArgs};
use crate::config::validate;
use crate::error::{AppError, EXIT_CONFIG, EXIT_FIT_FAILED, EXIT_IO};
use crate::math::IrlsSolver;

pub mod pipeline;

/// Entry point for the `gar` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Validate(args) => handle_validate(args),
        Command::Fit(args) => handle_fit(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_validate(args: ValidateArgs) -> Result<(), AppError> {
    let raw = crate::io::read_config_json(&args.config)?;
    let config = validate(&raw)?;

    println!("Configuration OK: {}", args.config.display());
    println!(
        "Target: {} | horizon={} | local projections h={}..={}",
        config.target, config.horizon, config.horizons.start, config.horizons.end
    );
    for reg in &config.regressors {
        let option = reg
            .spec
            .option()
            .map(|k| format!(" option={k}"))
            .unwrap_or_default();
        println!(
            "  {} <- {} {}{option}",
            reg.name,
            reg.spec.source,
            reg.spec.kind().display_name()
        );
    }
    let out = &config.outputs;
    println!(
        "Outputs: input='{}' quantreg='{}' cond_quant='{}' local_projection='{}'",
        out.input, out.quantreg, out.cond_quant, out.local_projection
    );
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let solver = solver_from_args(&args)?;

    // Configuration first: a bad config must not touch the data.
    let raw = crate::io::read_config_json(&args.config)?;
    let config = validate(&raw)?;
    let frame = crate::io::load_frame(&args.data)?;

    let log = pipeline::validation_log(&config);
    let output = pipeline::run_validated(&config, &frame, &solver, log)?;

    println!("{}", crate::report::format_run_summary(&output));
    println!(
        "{}",
        crate::report::format_coefficient_table(&output.coefficient_table)
    );
    println!(
        "{}",
        crate::report::format_conditional_quantiles(&output.conditional_quantiles)
    );
    if args.diagnostics {
        println!("{}", crate::report::format_diagnostics(&output.diagnostics));
    }

    if !args.no_export {
        let written = crate::io::write_outputs(&args.out_dir, &output, &[args.data.as_path()])?;
        for path in &written {
            println!("wrote {}", path.display());
        }
    }

    if output.outcome.is_failure() {
        return Err(AppError::new(EXIT_FIT_FAILED, output.status_action));
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let spec = crate::data::SampleSpec {
        rows: args.rows,
        seed: args.seed,
        ..crate::data::SampleSpec::default()
    };
    let frame = crate::data::generate_panel(&spec)?;

    let file = File::create(&args.out).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to create sample CSV '{}': {e}", args.out.display()),
        )
    })?;
    crate::io::write_frame_csv(file, &frame)
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to write sample CSV: {e}")))?;
    crate::io::write_config_json(&args.config_out, &crate::data::sample_config())?;

    info!(rows = frame.len(), seed = args.seed, "generated sample panel");
    println!(
        "wrote {} ({} rows) and {}",
        args.out.display(),
        frame.len(),
        args.config_out.display()
    );
    Ok(())
}

fn solver_from_args(args: &FitArgs) -> Result<IrlsSolver, AppError> {
    if args.max_iter == 0 {
        return Err(AppError::new(EXIT_CONFIG, "--max-iter must be > 0."));
    }
    if !(args.tolerance.is_finite() && args.tolerance > 0.0) {
        return Err(AppError::new(EXIT_CONFIG, "--tolerance must be a positive number."));
    }
    Ok(IrlsSolver {
        max_iter: args.max_iter,
        tolerance: args.tolerance,
    })
}
