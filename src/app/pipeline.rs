//! The transform-and-fit pipeline shared by every front-end.
//!
//! validate -> transform features -> quantile regression panel -> aggregate
//!
//! Configuration errors stop the run before any data is touched. Estimation
//! problems never stop it; they show up in the diagnostics and the outcome.

use tracing::{info, warn};

use crate::config::{QuantfitConfig, RawConfig, validate};
use crate::error::{DataError, PipelineError};
use crate::fit::{DriverInput, run_quantile_panel};
use crate::frame::TimeSeriesFrame;
use crate::math::QuantileSolver;
use crate::report::{PipelineOutput, ProcessingLog, aggregate};
use crate::transform::transform_features;

/// Validate `raw` and run the full pipeline on `frame`.
pub fn run_pipeline(
    raw: &RawConfig,
    frame: &TimeSeriesFrame,
    solver: &dyn QuantileSolver,
) -> Result<PipelineOutput, PipelineError> {
    let config = validate(raw)?;
    Ok(run_validated(&config, frame, solver, validation_log(&config))?)
}

/// Processing log opened with the validation entry for `config`.
pub fn validation_log(config: &QuantfitConfig) -> ProcessingLog {
    let mut log = ProcessingLog::new();
    log.record(format!(
        "Configuration validated: target {}, horizon {}, {} quantiles, {} regressors.",
        config.target,
        config.horizon,
        config.quantiles.len(),
        config.regressors.len()
    ));
    log
}

/// Run the pipeline for an already validated configuration.
pub fn run_validated(
    config: &QuantfitConfig,
    frame: &TimeSeriesFrame,
    solver: &dyn QuantileSolver,
    mut log: ProcessingLog,
) -> Result<PipelineOutput, DataError> {
    info!(
        target_series = %config.target,
        horizon = config.horizon,
        horizons = ?config.horizons,
        rows = frame.len(),
        "starting quantile fit"
    );

    frame.require(&config.target)?;
    let needed = config
        .regressors
        .max_lookback()
        .saturating_add(config.horizons.end);
    if frame.len() <= needed {
        warn!(
            rows = frame.len(),
            needed = needed.saturating_add(1),
            "data is shorter than the longest lookback plus horizon"
        );
    }
    let features = transform_features(frame, &config.regressors)?;
    log.record(format!(
        "Transformed {} regressors over {} rows.",
        config.regressors.len(),
        frame.len()
    ));

    let driver = run_quantile_panel(
        DriverInput {
            frame: &features,
            target: &config.target,
            regressors: &config.regressors,
            horizon: config.horizon,
            horizons: config.horizons,
            quantiles: &config.quantiles,
        },
        solver,
    )?;

    let output = aggregate(config, driver, log);
    info!(
        status = output.outcome.status.display_name(),
        code = output.outcome.diagnostic_code,
        "{}",
        output.status_action
    );
    Ok(output)
}
