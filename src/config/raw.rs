//! Raw configuration record, as supplied by the configuration source.
//!
//! Nothing here is validated; see [`crate::config::validate`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Name of the outcome series.
    pub target: String,
    /// Primary forecast horizon, in periods.
    pub horizon: i64,
    /// Quantile levels to fit.
    pub quantiles: Vec<f64>,
    #[serde(default)]
    pub regressors: Vec<RawRegressor>,
    /// Horizon span for local projections (defaults to the primary horizon only).
    #[serde(default)]
    pub local_projection: Option<RawHorizonRange>,
    #[serde(default)]
    pub outputs: RawOutputs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRegressor {
    /// Source series in the data table.
    pub series: String,
    /// Transform name (`Identity`/`None`, `Lagged`, `MovingAverage`/`MVA`, ...).
    pub transform: String,
    #[serde(default)]
    pub option: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHorizonRange {
    pub start: i64,
    pub end: i64,
}

/// Output destination identifiers. Blank or missing entries fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOutputs {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub quantreg: Option<String>,
    #[serde(default)]
    pub cond_quant: Option<String>,
    #[serde(default)]
    pub local_projection: Option<String>,
}

impl RawRegressor {
    pub fn new(
        series: impl Into<String>,
        transform: impl Into<String>,
        option: Option<f64>,
    ) -> Self {
        Self {
            series: series.into(),
            transform: transform.into(),
            option,
        }
    }
}
