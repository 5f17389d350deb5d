//! Horizon-shifted targets and estimation samples.
//!
//! The outcome at horizon `h` for feature row `t` is the target observed at
//! `t + h`. A row enters the estimation sample only if every feature and the
//! shifted target are observed, so burn-in rows at the start and the last `h`
//! rows (no realized future yet) drop out.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// `out[t] = values[t + horizon]`, missing past the end of the series.
pub fn shift_target(values: &[Option<f64>], horizon: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| {
            t.checked_add(horizon)
                .and_then(|i| values.get(i))
                .copied()
                .flatten()
        })
        .collect()
}

/// Full design row `[1, x_1[t], ..., x_k[t]]`, or `None` if any feature is missing.
pub fn design_row(features: &[&[Option<f64>]], t: usize) -> Option<Vec<f64>> {
    let mut row = Vec::with_capacity(features.len() + 1);
    row.push(1.0);
    for col in features {
        row.push(col.get(t).copied().flatten()?);
    }
    Some(row)
}

/// Rows usable for fitting at one horizon.
#[derive(Debug, Clone)]
pub struct EstimationSample {
    pub horizon: usize,
    /// Frame row indices included, ascending.
    pub rows: Vec<usize>,
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
}

impl EstimationSample {
    /// Collect rows where the features and the `horizon`-shifted target are observed.
    ///
    /// A horizon at or past the end of the target gives an empty sample
    /// without scanning the data.
    pub fn build(features: &[&[Option<f64>]], target: &[Option<f64>], horizon: usize) -> Self {
        let p = features.len() + 1;
        if horizon >= target.len() {
            return Self::empty(horizon, p);
        }
        let shifted = shift_target(target, horizon);

        let mut rows = Vec::new();
        let mut data = Vec::new();
        let mut ys = Vec::new();
        for (t, y) in shifted.iter().enumerate() {
            let Some(y) = *y else { continue };
            let Some(row) = design_row(features, t) else {
                continue;
            };
            rows.push(t);
            data.extend(row);
            ys.push(y);
        }

        let n = rows.len();
        Self {
            horizon,
            rows,
            x: DMatrix::from_row_slice(n, p, &data),
            y: DVector::from_vec(ys),
        }
    }

    /// No rows, `n_params` columns.
    pub fn empty(horizon: usize, n_params: usize) -> Self {
        Self {
            horizon,
            rows: Vec::new(),
            x: DMatrix::zeros(0, n_params),
            y: DVector::zeros(0),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Intercept plus one coefficient per feature.
    pub fn n_params(&self) -> usize {
        self.x.ncols()
    }

    pub fn window(&self, dates: &[NaiveDate]) -> EstimationWindow {
        EstimationWindow {
            horizon: self.horizon,
            n_obs: self.len(),
            start: self.rows.first().and_then(|&t| dates.get(t).copied()),
            end: self.rows.last().and_then(|&t| dates.get(t).copied()),
        }
    }
}

/// Size and date span of the estimation sample at one horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimationWindow {
    pub horizon: usize,
    pub n_obs: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_moves_future_values_back() {
        let y = vec![Some(1.0), Some(2.0), None, Some(4.0)];
        assert_eq!(shift_target(&y, 1), vec![Some(2.0), None, Some(4.0), None]);
        assert_eq!(shift_target(&y, 0), y);
        assert!(shift_target(&y, 10).iter().all(Option::is_none));
        assert!(shift_target(&y, usize::MAX).iter().all(Option::is_none));
    }

    #[test]
    fn sample_drops_burn_in_and_tail() {
        let x: Vec<Option<f64>> = vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let y: Vec<Option<f64>> = (0..5).map(|i| Some(f64::from(i) * 10.0)).collect();
        let sample = EstimationSample::build(&[&x], &y, 2);
        assert_eq!(sample.rows, vec![1, 2]);
        assert_eq!(sample.n_params(), 2);
        assert_eq!(sample.y.as_slice(), &[30.0, 40.0]);
        assert_eq!(sample.x[(0, 0)], 1.0);
        assert_eq!(sample.x[(1, 1)], 2.0);
    }

    #[test]
    fn sample_is_empty_when_horizon_exceeds_data() {
        let x: Vec<Option<f64>> = vec![Some(1.0); 4];
        let sample = EstimationSample::build(&[&x], &x, 4);
        assert!(sample.is_empty());
        assert_eq!(sample.x.nrows(), 0);
        assert_eq!(sample.x.ncols(), 2);

        let far = EstimationSample::build(&[&x], &x, usize::MAX);
        assert!(far.is_empty());
        assert_eq!(far.horizon, usize::MAX);
        assert_eq!(far.n_params(), 2);
        assert_eq!(far.y.len(), 0);
    }

    #[test]
    fn design_row_requires_every_feature() {
        let a = vec![Some(1.0), Some(2.0)];
        let b = vec![Some(5.0), None];
        assert_eq!(design_row(&[&a, &b], 0), Some(vec![1.0, 1.0, 5.0]));
        assert_eq!(design_row(&[&a, &b], 1), None);
        assert_eq!(design_row(&[], 7), Some(vec![1.0]));
    }
}
