//! Synthetic monthly macro panel for demos and tests.
//!
//! Three series:
//! - `fci`: financial conditions index, AR(1)
//! - `credit`: credit-to-GDP gap, persistent AR(1) fed by `fci`
//! - `gdp`: growth, driven by last month's `fci` and `credit`
//!
//! Growth shocks are left-skewed and scale with tight financial conditions, so
//! the lower quantiles of `gdp` react more to `fci` than the median does.

use chrono::{Months, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::config::{RawConfig, RawHorizonRange, RawOutputs, RawRegressor};
use crate::domain::CANONICAL_QUANTILES;
use crate::error::{AppError, EXIT_CONFIG};
use crate::frame::TimeSeriesFrame;

pub const SAMPLE_TARGET: &str = "gdp";
pub const SAMPLE_FCI: &str = "fci";
pub const SAMPLE_CREDIT: &str = "credit";

const FCI_PERSISTENCE: f64 = 0.85;
const CREDIT_PERSISTENCE: f64 = 0.95;
const TREND_GROWTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub rows: usize,
    pub seed: u64,
    /// Date of the first row; later rows step one month.
    pub start: NaiveDate,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            rows: 240,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        }
    }
}

/// Generate the panel. Identical specs give identical frames.
pub fn generate_panel(spec: &SampleSpec) -> Result<TimeSeriesFrame, AppError> {
    if spec.rows == 0 {
        return Err(AppError::new(EXIT_CONFIG, "Sample row count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Noise distribution error: {e}")))?;

    let mut dates = Vec::with_capacity(spec.rows);
    for i in 0..spec.rows {
        let months = u32::try_from(i)
            .map_err(|_| AppError::new(EXIT_CONFIG, "Sample row count is too large."))?;
        let date = spec
            .start
            .checked_add_months(Months::new(months))
            .ok_or_else(|| AppError::new(EXIT_CONFIG, "Sample dates overflow the calendar."))?;
        dates.push(date);
    }

    let mut fci = Vec::with_capacity(spec.rows);
    let mut credit = Vec::with_capacity(spec.rows);
    let mut gdp = Vec::with_capacity(spec.rows);

    let (mut f_prev, mut c_prev) = (0.0_f64, 0.0_f64);
    for _ in 0..spec.rows {
        let z: f64 = normal.sample(&mut rng);
        let shock = growth_shock(f_prev, z);
        let g = TREND_GROWTH - 0.25 * f_prev - 0.15 * c_prev + shock;

        let f = FCI_PERSISTENCE * f_prev + 0.5 * normal.sample(&mut rng);
        let c = CREDIT_PERSISTENCE * c_prev + 0.1 * f + 0.3 * normal.sample(&mut rng);

        gdp.push(Some(g));
        fci.push(Some(f));
        credit.push(Some(c));
        f_prev = f;
        c_prev = c;
    }

    let mut frame = TimeSeriesFrame::new(dates)?;
    frame.push_column(SAMPLE_TARGET, gdp)?;
    frame.push_column(SAMPLE_FCI, fci)?;
    frame.push_column(SAMPLE_CREDIT, credit)?;
    Ok(frame)
}

/// Scale grows with tight conditions; the downside is amplified further.
fn growth_shock(fci_prev: f64, z: f64) -> f64 {
    let stress = fci_prev.max(0.0);
    let scale = 0.5 + 0.4 * stress;
    if z < 0.0 {
        scale * z * (1.0 + 0.8 * stress)
    } else {
        scale * z
    }
}

/// A configuration matching the generated panel.
pub fn sample_config() -> RawConfig {
    RawConfig {
        target: SAMPLE_TARGET.to_string(),
        horizon: 3,
        quantiles: CANONICAL_QUANTILES.to_vec(),
        regressors: vec![
            RawRegressor::new(SAMPLE_FCI, "Identity", None),
            RawRegressor::new(SAMPLE_CREDIT, "MovingAverage", Some(3.0)),
            RawRegressor::new(SAMPLE_TARGET, "Identity", None),
        ],
        local_projection: Some(RawHorizonRange { start: 1, end: 6 }),
        outputs: RawOutputs::default(),
    }
}
