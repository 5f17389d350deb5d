//! Quantile regression driver.
//!
//! For every quantile level and every horizon in the local-projection range we fit
//! the `h`-shifted target on the features plus an intercept. The fits share no
//! state, so they run in parallel; a failed fit is recorded and never stops its
//! siblings.
//!
//! Outputs:
//! - coefficients at the primary horizon (`QuantileRegressionResult`)
//! - coefficient paths over the horizon range (`LocalProjectionResult`)
//! - conditional quantiles at the primary horizon, evaluated at the most recent
//!   fully observed feature row (`ConditionalQuantileEstimate`)
//! - per-fit diagnostics and the aggregate `FitOutcome`
//!
//! Quantile crossing is reported as fitted; nothing is re-sorted.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{
    CoefficientRow, ConditionalQuantileEstimate, ConditionalQuantileRow, FitDiagnostic, FitOutcome,
    HorizonRange, INTERCEPT, LocalProjectionResult, QuantileRegressionResult, QuantileSet,
    RegressorSet, STATUS_CONVERGED, shifted_target_name,
};
use crate::error::{DataError, EstimationError};
use crate::fit::sample::{EstimationSample, EstimationWindow, design_row, shift_target};
use crate::frame::TimeSeriesFrame;
use crate::math::{QuantileFit, QuantileSolver};

/// Everything the driver needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct DriverInput<'a> {
    /// Frame holding the raw target and the transformed feature columns.
    pub frame: &'a TimeSeriesFrame,
    pub target: &'a str,
    pub regressors: &'a RegressorSet,
    pub horizon: usize,
    pub horizons: HorizonRange,
    pub quantiles: &'a QuantileSet,
}

/// Result of one (quantile, horizon) fit.
#[derive(Debug, Clone)]
pub struct FitRecord {
    pub quantile: f64,
    pub horizon: usize,
    pub n_obs: usize,
    pub result: Result<QuantileFit, EstimationError>,
}

impl FitRecord {
    pub fn fit(&self) -> Option<&QuantileFit> {
        self.result.as_ref().ok()
    }

    fn diagnostic(&self) -> FitDiagnostic {
        match &self.result {
            Ok(fit) => FitDiagnostic {
                quantile: self.quantile,
                horizon: self.horizon,
                n_obs: self.n_obs,
                iterations: Some(fit.iterations),
                check_loss: Some(fit.check_loss),
                status: STATUS_CONVERGED.to_string(),
            },
            Err(err) => FitDiagnostic {
                quantile: self.quantile,
                horizon: self.horizon,
                n_obs: self.n_obs,
                iterations: match err {
                    EstimationError::NotConverged { iterations } => Some(*iterations),
                    _ => None,
                },
                check_loss: None,
                status: err.label().to_string(),
            },
        }
    }
}

/// All outputs of the driver.
#[derive(Debug, Clone)]
pub struct DriverOutput {
    /// Input frame plus the shifted target column at the primary horizon.
    pub frame: TimeSeriesFrame,
    pub coefficients: QuantileRegressionResult,
    pub conditional_quantiles: ConditionalQuantileEstimate,
    pub local_projections: LocalProjectionResult,
    pub diagnostics: Vec<FitDiagnostic>,
    pub windows: Vec<EstimationWindow>,
    pub outcome: FitOutcome,
}

/// Run the full (quantile × horizon) panel of fits.
///
/// Missing columns are fatal (`DataError`); estimation problems are contained
/// per fit and summarized in `FitOutcome`.
pub fn run_quantile_panel(
    input: DriverInput<'_>,
    solver: &dyn QuantileSolver,
) -> Result<DriverOutput, DataError> {
    let frame = input.frame;
    let target = frame.require(input.target)?;
    let feature_names = input.regressors.names();
    let features = feature_names
        .iter()
        .map(|name| frame.require(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out_frame = frame.clone();
    out_frame.set_column(
        shifted_target_name(input.target, input.horizon),
        shift_target(target, input.horizon),
    )?;

    let samples: Vec<EstimationSample> = input
        .horizons
        .iter()
        .map(|h| EstimationSample::build(&features, target, h))
        .collect();
    let windows: Vec<EstimationWindow> = samples.iter().map(|s| s.window(frame.dates())).collect();

    for (w, s) in windows.iter().zip(&samples) {
        debug!(
            horizon = w.horizon,
            n_obs = w.n_obs,
            n_params = s.n_params(),
            start = ?w.start,
            end = ?w.end,
            "estimation sample"
        );
    }

    let jobs: Vec<(f64, &EstimationSample)> = input
        .quantiles
        .levels()
        .iter()
        .flat_map(|&q| samples.iter().map(move |s| (q, s)))
        .collect();

    if samples.iter().all(EstimationSample::is_empty) {
        warn!(
            series = input.target,
            rows = frame.len(),
            horizon = input.horizon,
            "estimation sample is empty at every horizon"
        );
        let diagnostics = jobs
            .iter()
            .map(|&(q, s)| {
                FitRecord {
                    quantile: q,
                    horizon: s.horizon,
                    n_obs: 0,
                    result: Err(EstimationError::EmptySample),
                }
                .diagnostic()
            })
            .collect();
        return Ok(DriverOutput {
            frame: out_frame,
            coefficients: QuantileRegressionResult::default(),
            conditional_quantiles: ConditionalQuantileEstimate::default(),
            local_projections: LocalProjectionResult::default(),
            diagnostics,
            windows,
            outcome: FitOutcome::empty_sample(),
        });
    }

    info!(
        fits = jobs.len(),
        quantiles = input.quantiles.len(),
        horizons = samples.len(),
        features = feature_names.len(),
        "fitting quantile regressions"
    );

    let records: Vec<FitRecord> = jobs
        .par_iter()
        .map(|&(q, sample)| FitRecord {
            quantile: q,
            horizon: sample.horizon,
            n_obs: sample.len(),
            result: solver.fit(&sample.x, &sample.y, q),
        })
        .collect();

    for rec in &records {
        match &rec.result {
            Ok(fit) => debug!(
                quantile = rec.quantile,
                horizon = rec.horizon,
                iterations = fit.iterations,
                check_loss = fit.check_loss,
                "fit converged"
            ),
            Err(err) => warn!(
                quantile = rec.quantile,
                horizon = rec.horizon,
                n_obs = rec.n_obs,
                "fit failed: {err}"
            ),
        }
    }

    let local_rows = coefficient_rows(&records, &feature_names);
    let primary_rows = local_rows
        .iter()
        .filter(|r| r.horizon == input.horizon)
        .cloned()
        .collect();

    let conditional_quantiles = conditional_quantiles(
        &records,
        &feature_names,
        frame,
        input.horizon,
        input.quantiles,
    )?;

    let converged = records.iter().filter(|r| r.result.is_ok()).count();
    let outcome = FitOutcome::from_counts(converged, records.len());
    info!(
        converged,
        total = records.len(),
        status = outcome.status.display_name(),
        "quantile regressions finished"
    );

    Ok(DriverOutput {
        frame: out_frame,
        coefficients: QuantileRegressionResult { rows: primary_rows },
        conditional_quantiles,
        local_projections: LocalProjectionResult { rows: local_rows },
        diagnostics: records.iter().map(FitRecord::diagnostic).collect(),
        windows,
        outcome,
    })
}

/// One row per (record, feature); intercept first, then regressors in set order.
fn coefficient_rows(records: &[FitRecord], feature_names: &[String]) -> Vec<CoefficientRow> {
    let names: Vec<&str> = std::iter::once(INTERCEPT)
        .chain(feature_names.iter().map(String::as_str))
        .collect();

    let mut rows = Vec::with_capacity(records.len() * names.len());
    for rec in records {
        for (j, name) in names.iter().enumerate() {
            rows.push(CoefficientRow {
                quantile: rec.quantile,
                horizon: rec.horizon,
                feature: (*name).to_string(),
                coefficient: rec.fit().and_then(|f| f.coefficients.get(j).copied()),
            });
        }
    }
    rows
}

fn conditional_quantiles(
    records: &[FitRecord],
    feature_names: &[String],
    frame: &TimeSeriesFrame,
    horizon: usize,
    quantiles: &QuantileSet,
) -> Result<ConditionalQuantileEstimate, DataError> {
    // Latest row with every feature observed; the target may still be unrealized.
    let names: Vec<&str> = feature_names.iter().map(String::as_str).collect();
    let features = names
        .iter()
        .map(|name| frame.require(name))
        .collect::<Result<Vec<_>, _>>()?;
    let latest = frame
        .last_complete_row(&names)?
        .and_then(|t| design_row(&features, t).map(|row| (t, row)));

    if latest.is_none() {
        warn!("no fully observed feature row; conditional quantiles are missing");
    }

    let rows = quantiles
        .levels()
        .iter()
        .map(|&q| {
            let fit = records
                .iter()
                .find(|r| r.horizon == horizon && r.quantile == q)
                .and_then(FitRecord::fit);
            let value = match (fit, &latest) {
                (Some(fit), Some((_, row))) => Some(fit.predict(row)).filter(|v| v.is_finite()),
                _ => None,
            };
            ConditionalQuantileRow {
                quantile: q,
                horizon,
                date: latest.as_ref().and_then(|(t, _)| frame.dates().get(*t).copied()),
                value,
            }
        })
        .collect();

    Ok(ConditionalQuantileEstimate { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate_quantiles;
    use crate::domain::{CANONICAL_QUANTILES, FitStatus, Transform, TransformSpec};
    use crate::math::IrlsSolver;
    use chrono::NaiveDate;
    use nalgebra::{DMatrix, DVector};

    fn monthly(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2018, 1, 31).unwrap();
        (0..n)
            .map(|i| start + chrono::Months::new(i as u32))
            .collect()
    }

    /// Target driven by the previous period's regressor plus bounded noise.
    fn frame_with_feature(n: usize) -> (TimeSeriesFrame, RegressorSet) {
        let x: Vec<Option<f64>> = (0..n).map(|i| Some((i as f64 * 0.7).sin() * 2.0)).collect();
        let y: Vec<Option<f64>> = (0..n)
            .map(|i| {
                let prev = if i == 0 { 0.0 } else { x[i - 1].unwrap() };
                Some(1.0 + 0.8 * prev + (i as f64 * 1.3).cos())
            })
            .collect();
        let mut frame = TimeSeriesFrame::new(monthly(n)).unwrap();
        frame.push_column("gdp", y).unwrap();
        frame.push_column("fci", x.clone()).unwrap();

        let mut regs = RegressorSet::new();
        let reg = regs.push(TransformSpec {
            source: "fci".to_string(),
            transform: Transform::Identity,
        });
        let name = reg.name.clone();
        frame.push_column(name, x).unwrap();
        (frame, regs)
    }

    #[test]
    fn primary_horizon_outputs_have_expected_shape() {
        let (frame, regs) = frame_with_feature(24);
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let out = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "gdp",
                regressors: &regs,
                horizon: 1,
                horizons: HorizonRange::single(1),
                quantiles: &quantiles,
            },
            &IrlsSolver::default(),
        )
        .unwrap();

        assert_eq!(out.windows[0].n_obs, 23);
        assert_eq!(out.coefficients.rows.len(), 5 * 2);
        assert_eq!(out.coefficients.rows[0].feature, INTERCEPT);
        assert_eq!(out.coefficients.rows[1].feature, "fci_trans_0_None");
        assert_eq!(out.conditional_quantiles.rows.len(), 5);
        assert_eq!(out.outcome.status, FitStatus::Converged);
        assert_eq!(out.outcome.diagnostic_code, 5);
        // Last row has features but no realized target; it is still used for prediction.
        assert_eq!(out.conditional_quantiles.rows[0].date, Some(frame.dates()[23]));
        assert!(out.frame.has_column("gdp_hz_1"));
        assert_eq!(out.frame.column("gdp_hz_1").unwrap()[23], None);
    }

    #[test]
    fn horizon_range_produces_local_projection_paths() {
        let (frame, regs) = frame_with_feature(40);
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let out = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "gdp",
                regressors: &regs,
                horizon: 2,
                horizons: HorizonRange { start: 1, end: 4 },
                quantiles: &quantiles,
            },
            &IrlsSolver::default(),
        )
        .unwrap();

        assert_eq!(out.local_projections.rows.len(), 5 * 4 * 2);
        assert!(out.coefficients.rows.iter().all(|r| r.horizon == 2));
        assert_eq!(out.coefficients.rows.len(), 5 * 2);
        let path = out.local_projections.path(0.5, "fci_trans_0_None");
        assert_eq!(path.iter().map(|(h, _)| *h).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(
            out.windows.iter().map(|w| w.n_obs).collect::<Vec<_>>(),
            vec![39, 38, 37, 36]
        );
    }

    #[test]
    fn empty_sample_yields_empty_tables_and_failed_outcome() {
        let (frame, regs) = frame_with_feature(5);
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let out = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "gdp",
                regressors: &regs,
                horizon: 6,
                horizons: HorizonRange::single(6),
                quantiles: &quantiles,
            },
            &IrlsSolver::default(),
        )
        .unwrap();

        assert!(out.coefficients.is_empty());
        assert!(out.conditional_quantiles.is_empty());
        assert!(out.local_projections.is_empty());
        assert_eq!(out.outcome.status, FitStatus::Failed);
        assert!(out.outcome.diagnostic_code <= 0);
        assert_eq!(out.diagnostics.len(), 5);
        assert!(out.diagnostics.iter().all(|d| d.status == "empty_sample"));
    }

    #[test]
    fn horizons_past_the_data_are_empty_samples() {
        let (frame, regs) = frame_with_feature(24);
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let out = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "gdp",
                regressors: &regs,
                horizon: 1,
                horizons: HorizonRange { start: 1, end: 120 },
                quantiles: &quantiles,
            },
            &IrlsSolver::default(),
        )
        .unwrap();

        assert_eq!(out.windows.len(), 120);
        assert!(out.windows.iter().filter(|w| w.horizon >= 24).all(|w| w.n_obs == 0));
        assert_eq!(out.diagnostics.len(), 5 * 120);
        assert!(out
            .diagnostics
            .iter()
            .filter(|d| d.horizon >= 24)
            .all(|d| d.status == "empty_sample"));
        assert_eq!(out.outcome.status, FitStatus::PartialFailure);
        assert_eq!(out.coefficients.rows.len(), 5 * 2);
    }

    #[test]
    fn conditional_quantiles_use_last_complete_feature_row() {
        let (mut frame, regs) = frame_with_feature(24);
        let mut x = frame.column("fci_trans_0_None").unwrap().to_vec();
        x[23] = None;
        frame.set_column("fci_trans_0_None", x).unwrap();
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let out = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "gdp",
                regressors: &regs,
                horizon: 1,
                horizons: HorizonRange::single(1),
                quantiles: &quantiles,
            },
            &IrlsSolver::default(),
        )
        .unwrap();

        // Row 23 has no realized target, so the gap leaves the sample intact.
        assert_eq!(out.windows[0].n_obs, 23);
        assert!(out
            .conditional_quantiles
            .rows
            .iter()
            .all(|r| r.date == Some(frame.dates()[22])));
    }

    /// Always fails for one quantile level, succeeds otherwise.
    struct FailingAt(f64);

    impl QuantileSolver for FailingAt {
        fn fit(
            &self,
            x: &DMatrix<f64>,
            y: &DVector<f64>,
            quantile: f64,
        ) -> Result<QuantileFit, EstimationError> {
            if quantile == self.0 {
                return Err(EstimationError::NotConverged { iterations: 7 });
            }
            IrlsSolver::default().fit(x, y, quantile)
        }
    }

    #[test]
    fn failed_fit_is_explicitly_missing_and_partial() {
        let (frame, regs) = frame_with_feature(24);
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let out = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "gdp",
                regressors: &regs,
                horizon: 1,
                horizons: HorizonRange::single(1),
                quantiles: &quantiles,
            },
            &FailingAt(0.25),
        )
        .unwrap();

        assert_eq!(out.outcome.status, FitStatus::PartialFailure);
        assert_eq!(out.outcome.diagnostic_code, 4);
        let failed: Vec<_> = out
            .coefficients
            .rows
            .iter()
            .filter(|r| r.quantile == 0.25)
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|r| r.coefficient.is_none()));
        assert_eq!(out.conditional_quantiles.value(0.25), None);
        assert!(out.conditional_quantiles.value(0.5).is_some());
        let diag = out.diagnostics.iter().find(|d| d.quantile == 0.25).unwrap();
        assert_eq!(diag.status, "not_converged");
        assert_eq!(diag.iterations, Some(7));
    }

    #[test]
    fn missing_columns_are_data_errors() {
        let (frame, regs) = frame_with_feature(10);
        let quantiles = validate_quantiles(&CANONICAL_QUANTILES).unwrap();
        let result = run_quantile_panel(
            DriverInput {
                frame: &frame,
                target: "inflation",
                regressors: &regs,
                horizon: 1,
                horizons: HorizonRange::single(1),
                quantiles: &quantiles,
            },
            &IrlsSolver::default(),
        );
        assert!(matches!(result, Err(DataError::UnknownSeries(name)) if name == "inflation"));
    }
}
