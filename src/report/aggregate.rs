//! Result aggregation.
//!
//! Repackages the driver's tables into the pipeline output and derives the
//! status text. Nothing here touches a fitted coefficient; the pivot only
//! rearranges values the driver produced.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::config::{OutputTargets, QuantfitConfig};
use crate::domain::{
    ConditionalQuantileEstimate, FitDiagnostic, FitOutcome, FitStatus, INTERCEPT,
    LocalProjectionResult, QuantileRegressionResult, QuantileSet, RegressorSet, same_level,
};
use crate::fit::{DriverOutput, EstimationWindow};
use crate::frame::TimeSeriesFrame;

/// One processing-log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub time: NaiveDateTime,
    pub action: String,
}

/// Timestamped human-readable actions, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingLog {
    pub entries: Vec<LogEntry>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action stamped with the local wall-clock time.
    pub fn record(&mut self, action: impl Into<String>) {
        self.record_at(Local::now().naive_local(), action);
    }

    pub fn record_at(&mut self, time: NaiveDateTime, action: impl Into<String>) {
        self.entries.push(LogEntry {
            time,
            action: action.into(),
        });
    }

    pub fn last_action(&self) -> Option<&str> {
        self.entries.last().map(|e| e.action.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Status line for the processing log.
pub fn status_action(outcome: &FitOutcome, total_fits: usize) -> String {
    match outcome.status {
        FitStatus::Converged => "Quantile regression finished successfully.".to_string(),
        FitStatus::PartialFailure => format!(
            "Quantile regression finished with {} of {total_fits} fits converged.",
            outcome.diagnostic_code
        ),
        FitStatus::Failed => format!(
            "Failed to do quantile regression, exit code: {}",
            outcome.diagnostic_code
        ),
    }
}

/// Primary-horizon coefficients pivoted to `feature × quantile`.
///
/// Rows are the intercept followed by the regressors in declaration order;
/// columns follow the configured quantile order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    pub quantiles: Vec<f64>,
    pub features: Vec<String>,
    /// `values[row][col]`, aligned with `features` and `quantiles`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CoefficientTable {
    pub fn from_result(
        result: &QuantileRegressionResult,
        regressors: &RegressorSet,
        quantiles: &QuantileSet,
    ) -> Self {
        let features: Vec<String> = std::iter::once(INTERCEPT.to_string())
            .chain(regressors.names())
            .collect();
        let quantiles = quantiles.levels().to_vec();
        let values = features
            .iter()
            .map(|f| {
                quantiles
                    .iter()
                    .map(|&q| result.coefficient(q, f))
                    .collect()
            })
            .collect();
        Self {
            quantiles,
            features,
            values,
        }
    }

    pub fn get(&self, feature: &str, quantile: f64) -> Option<f64> {
        let row = self.features.iter().position(|f| f == feature)?;
        let col = self.quantiles.iter().position(|&q| same_level(q, quantile))?;
        self.values.get(row)?.get(col).copied().flatten()
    }
}

/// Everything a run produces, ready for the result sink.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub target: String,
    pub horizon: usize,
    pub regressors: RegressorSet,
    pub quantiles: QuantileSet,
    pub coefficients: QuantileRegressionResult,
    pub coefficient_table: CoefficientTable,
    pub conditional_quantiles: ConditionalQuantileEstimate,
    pub local_projections: LocalProjectionResult,
    pub diagnostics: Vec<FitDiagnostic>,
    pub windows: Vec<EstimationWindow>,
    pub outcome: FitOutcome,
    pub status_action: String,
    /// Input frame plus feature columns and the shifted target.
    pub frame: TimeSeriesFrame,
    pub destinations: OutputTargets,
    pub log: ProcessingLog,
}

/// Combine the driver's tables with the run configuration.
pub fn aggregate(
    config: &QuantfitConfig,
    driver: DriverOutput,
    mut log: ProcessingLog,
) -> PipelineOutput {
    let status_action = status_action(&driver.outcome, driver.diagnostics.len());
    log.record(status_action.clone());

    let coefficient_table =
        CoefficientTable::from_result(&driver.coefficients, &config.regressors, &config.quantiles);

    PipelineOutput {
        target: config.target.clone(),
        horizon: config.horizon,
        regressors: config.regressors.clone(),
        quantiles: config.quantiles.clone(),
        coefficients: driver.coefficients,
        coefficient_table,
        conditional_quantiles: driver.conditional_quantiles,
        local_projections: driver.local_projections,
        diagnostics: driver.diagnostics,
        windows: driver.windows,
        outcome: driver.outcome,
        status_action,
        frame: driver.frame,
        destinations: config.outputs.clone(),
        log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate_quantiles;
    use crate::domain::{CoefficientRow, Transform, TransformSpec};
    use chrono::NaiveDate;

    fn regressors() -> RegressorSet {
        let mut set = RegressorSet::new();
        set.push(TransformSpec {
            source: "fci".to_string(),
            transform: Transform::Identity,
        });
        set.push(TransformSpec {
            source: "credit".to_string(),
            transform: Transform::Lagged(1),
        });
        set
    }

    #[test]
    fn status_text_follows_outcome() {
        assert_eq!(
            status_action(&FitOutcome::from_counts(10, 10), 10),
            "Quantile regression finished successfully."
        );
        assert_eq!(
            status_action(&FitOutcome::from_counts(7, 10), 10),
            "Quantile regression finished with 7 of 10 fits converged."
        );
        assert_eq!(
            status_action(&FitOutcome::empty_sample(), 5),
            "Failed to do quantile regression, exit code: -1"
        );
        assert_eq!(
            status_action(&FitOutcome::from_counts(0, 5), 5),
            "Failed to do quantile regression, exit code: 0"
        );
    }

    #[test]
    fn pivot_keeps_declaration_and_quantile_order() {
        let regs = regressors();
        let names = regs.names();
        // Quantiles configured out of ascending order on purpose.
        let quantiles = validate_quantiles(&[0.9, 0.1, 0.25, 0.5, 0.75]).unwrap();

        let mut rows = Vec::new();
        for &q in quantiles.levels() {
            for (j, f) in std::iter::once(INTERCEPT.to_string())
                .chain(names.iter().cloned())
                .enumerate()
            {
                rows.push(CoefficientRow {
                    quantile: q,
                    horizon: 1,
                    feature: f,
                    coefficient: if q == 0.25 { None } else { Some(q * 10.0 + j as f64) },
                });
            }
        }
        let table = CoefficientTable::from_result(
            &QuantileRegressionResult { rows },
            &regs,
            &quantiles,
        );

        assert_eq!(table.features[0], INTERCEPT);
        assert_eq!(&table.features[1..], names.as_slice());
        assert_eq!(table.quantiles, vec![0.9, 0.1, 0.25, 0.5, 0.75]);
        assert_eq!(table.get(&names[1], 0.9), Some(11.0));
        assert_eq!(table.get(INTERCEPT, 0.1), Some(1.0));
        assert_eq!(table.get(&names[0], 0.25), None);
        assert_eq!(table.get("unknown", 0.5), None);
    }

    #[test]
    fn log_records_in_order() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut log = ProcessingLog::new();
        log.record_at(t, "Configuration validated.");
        log.record("Quantile regression finished successfully.");
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries[0].time, t);
        assert_eq!(
            log.last_action(),
            Some("Quantile regression finished successfully.")
        );
    }
}
