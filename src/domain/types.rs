//! Shared domain types.
//!
//! Everything here is created fresh per pipeline run. Configuration-side types
//! (`RegressorSet`, `QuantileSet`, `HorizonRange`) are only built by the validator;
//! result-side types are only built by the fit driver.

use chrono::NaiveDate;
use serde::Serialize;

/// Quantile levels every configuration must contain.
///
/// Forecast summaries and downstream density fitting probe these points.
pub const CANONICAL_QUANTILES: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

/// Reserved feature name for the regression constant.
pub const INTERCEPT: &str = "Intercept";

/// Tolerance used when comparing quantile levels.
const LEVEL_EPS: f64 = 1e-9;

/// Whether two quantile levels denote the same probability.
pub fn same_level(a: f64, b: f64) -> bool {
    (a - b).abs() < LEVEL_EPS
}

/// Which transformation a regressor applies to its source series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransformKind {
    Identity,
    Lagged,
    MovingAverage,
    Power,
    Difference,
    PercentChange,
}

impl TransformKind {
    pub const ALL: [TransformKind; 6] = [
        TransformKind::Identity,
        TransformKind::Lagged,
        TransformKind::MovingAverage,
        TransformKind::Power,
        TransformKind::Difference,
        TransformKind::PercentChange,
    ];

    /// Parse a transform name.
    ///
    /// Accepts the canonical names as well as the short labels used by the
    /// parameter sheet (`None`, `MVA`, `Diff`, `ChangeRate`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Identity" | "None" => Some(Self::Identity),
            "Lagged" => Some(Self::Lagged),
            "MovingAverage" | "MVA" => Some(Self::MovingAverage),
            "Power" => Some(Self::Power),
            "Difference" | "Diff" => Some(Self::Difference),
            "PercentChange" | "ChangeRate" => Some(Self::PercentChange),
            _ => None,
        }
    }

    /// Short label embedded in synthesized feature names.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Identity => "None",
            Self::Lagged => "Lagged",
            Self::MovingAverage => "MVA",
            Self::Power => "Power",
            Self::Difference => "Diff",
            Self::PercentChange => "ChangeRate",
        }
    }

    /// Human-readable label for terminal output and error messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Identity => "Identity",
            Self::Lagged => "Lagged",
            Self::MovingAverage => "MovingAverage",
            Self::Power => "Power",
            Self::Difference => "Difference",
            Self::PercentChange => "PercentChange",
        }
    }

    /// Smallest admissible option, or `None` when the option is unbounded (`Power`).
    ///
    /// `Identity` takes no option at all; see [`TransformKind::takes_option`].
    pub fn min_option(self) -> Option<i64> {
        match self {
            Self::Identity | Self::Power => None,
            Self::Lagged | Self::Difference | Self::PercentChange => Some(0),
            Self::MovingAverage => Some(1),
        }
    }

    pub fn takes_option(self) -> bool {
        self != Self::Identity
    }
}

/// A transform with its (already normalized) integer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transform {
    Identity,
    /// `x[t-k]`
    Lagged(usize),
    /// Trailing mean over `k` rows ending at `t`.
    MovingAverage(usize),
    /// `x[t]^k`
    Power(i32),
    /// `x[t] - x[t-k]`
    Difference(usize),
    /// `(x[t] - x[t-k]) / x[t-k]`
    PercentChange(usize),
}

impl Transform {
    pub fn kind(self) -> TransformKind {
        match self {
            Self::Identity => TransformKind::Identity,
            Self::Lagged(_) => TransformKind::Lagged,
            Self::MovingAverage(_) => TransformKind::MovingAverage,
            Self::Power(_) => TransformKind::Power,
            Self::Difference(_) => TransformKind::Difference,
            Self::PercentChange(_) => TransformKind::PercentChange,
        }
    }

    /// The option value, if the transform carries one.
    pub fn option(self) -> Option<i64> {
        match self {
            Self::Identity => None,
            Self::Lagged(k)
            | Self::MovingAverage(k)
            | Self::Difference(k)
            | Self::PercentChange(k) => Some(k as i64),
            Self::Power(k) => Some(i64::from(k)),
        }
    }

    /// Rows of history the transform needs before producing a value.
    pub fn lookback(self) -> usize {
        match self {
            Self::Identity | Self::Power(_) => 0,
            Self::Lagged(k) | Self::Difference(k) | Self::PercentChange(k) => k,
            Self::MovingAverage(k) => k.saturating_sub(1),
        }
    }
}

/// A validated transform declaration for one regressor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformSpec {
    pub source: String,
    pub transform: Transform,
}

impl TransformSpec {
    pub fn kind(&self) -> TransformKind {
        self.transform.kind()
    }

    pub fn option(&self) -> Option<i64> {
        self.transform.option()
    }
}

/// One named feature and the transform producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regressor {
    pub name: String,
    pub spec: TransformSpec,
}

/// Ordered regressor declarations.
///
/// Insertion order is the display order for every regressor-indexed output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegressorSet {
    entries: Vec<Regressor>,
}

impl RegressorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a regressor, synthesizing its feature name from the source series,
    /// its ordinal position and the transform tag.
    pub fn push(&mut self, spec: TransformSpec) -> &Regressor {
        let ordinal = self.entries.len();
        let name = feature_name(&spec.source, ordinal, spec.kind());
        self.entries.push(Regressor { name, spec });
        &self.entries[ordinal]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Regressor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Feature names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.name.clone()).collect()
    }

    /// Largest lookback across all regressors (burn-in length).
    pub fn max_lookback(&self) -> usize {
        self.entries
            .iter()
            .map(|r| r.spec.transform.lookback())
            .max()
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a RegressorSet {
    type Item = &'a Regressor;
    type IntoIter = std::slice::Iter<'a, Regressor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Synthesized feature name: `{source}_trans_{ordinal}_{tag}`.
pub fn feature_name(source: &str, ordinal: usize, kind: TransformKind) -> String {
    format!("{source}_trans_{ordinal}_{}", kind.tag())
}

/// Validated quantile levels, in configured order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileSet {
    levels: Vec<f64>,
}

impl QuantileSet {
    /// Wrap already validated levels. Use `config::validate_quantiles` for raw input.
    pub(crate) fn from_validated(levels: Vec<f64>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, level: f64) -> bool {
        self.levels.iter().any(|&q| same_level(q, level))
    }
}

/// Inclusive range of forecast horizons for local projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HorizonRange {
    pub start: usize,
    pub end: usize,
}

impl HorizonRange {
    pub fn single(horizon: usize) -> Self {
        Self {
            start: horizon,
            end: horizon,
        }
    }

    pub fn contains(&self, horizon: usize) -> bool {
        (self.start..=self.end).contains(&horizon)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Name of the horizon-shifted target column, e.g. `gdp_hz_4`.
pub fn shifted_target_name(target: &str, horizon: usize) -> String {
    format!("{target}_hz_{horizon}")
}

/// One fitted coefficient.
///
/// `coefficient` is `None` when the fit for this (quantile, horizon) failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub quantile: f64,
    pub horizon: usize,
    pub feature: String,
    pub coefficient: Option<f64>,
}

/// Coefficients at the primary horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuantileRegressionResult {
    pub rows: Vec<CoefficientRow>,
}

/// Coefficient paths across the configured horizon range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalProjectionResult {
    pub rows: Vec<CoefficientRow>,
}

impl QuantileRegressionResult {
    pub fn coefficient(&self, quantile: f64, feature: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| same_level(r.quantile, quantile) && r.feature == feature)
            .and_then(|r| r.coefficient)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl LocalProjectionResult {
    pub fn coefficient(&self, quantile: f64, horizon: usize, feature: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| {
                same_level(r.quantile, quantile) && r.horizon == horizon && r.feature == feature
            })
            .and_then(|r| r.coefficient)
    }

    /// Coefficient path of one feature at one quantile, ordered by horizon.
    pub fn path(&self, quantile: f64, feature: &str) -> Vec<(usize, Option<f64>)> {
        self.rows
            .iter()
            .filter(|r| same_level(r.quantile, quantile) && r.feature == feature)
            .map(|r| (r.horizon, r.coefficient))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fitted conditional quantile at the primary horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalQuantileRow {
    pub quantile: f64,
    pub horizon: usize,
    /// Date of the feature row the model was evaluated at.
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionalQuantileEstimate {
    pub rows: Vec<ConditionalQuantileRow>,
}

impl ConditionalQuantileEstimate {
    pub fn value(&self, quantile: f64) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| same_level(r.quantile, quantile))
            .and_then(|r| r.value)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-fit health record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostic {
    pub quantile: f64,
    pub horizon: usize,
    pub n_obs: usize,
    pub iterations: Option<usize>,
    pub check_loss: Option<f64>,
    pub status: String,
}

impl FitDiagnostic {
    pub fn converged(&self) -> bool {
        self.status == STATUS_CONVERGED
    }
}

/// Status label for a converged fit in [`FitDiagnostic::status`].
pub const STATUS_CONVERGED: &str = "converged";

/// Aggregate health of all fits in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitStatus {
    Converged,
    PartialFailure,
    Failed,
}

impl FitStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::PartialFailure => "partial failure",
            Self::Failed => "failed",
        }
    }
}

/// Status plus diagnostic code; a non-positive code signals failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FitOutcome {
    pub status: FitStatus,
    pub diagnostic_code: i32,
}

impl FitOutcome {
    /// Code used when no horizon had any usable observation.
    pub const EMPTY_SAMPLE_CODE: i32 = -1;

    /// Derive the outcome from converged/attempted fit counts.
    pub fn from_counts(converged: usize, total: usize) -> Self {
        let status = if total > 0 && converged == total {
            FitStatus::Converged
        } else if converged > 0 {
            FitStatus::PartialFailure
        } else {
            FitStatus::Failed
        };
        Self {
            status,
            diagnostic_code: i32::try_from(converged).unwrap_or(i32::MAX),
        }
    }

    pub fn empty_sample() -> Self {
        Self {
            status: FitStatus::Failed,
            diagnostic_code: Self::EMPTY_SAMPLE_CODE,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.diagnostic_code <= 0
    }
}
