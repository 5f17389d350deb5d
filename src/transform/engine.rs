//! Feature transforms.
//!
//! Each transform maps a raw series to a feature series of the same length.
//! Rows without enough history are `None`, and a missing input anywhere in a
//! row's lookback makes that row `None`. Non-finite results (`0^-1`, overflow)
//! are also reported as missing.

use tracing::debug;

use crate::domain::{RegressorSet, Transform};
use crate::error::DataError;
use crate::frame::TimeSeriesFrame;

/// Apply one transform to a series.
pub fn apply_transform(values: &[Option<f64>], transform: Transform) -> Vec<Option<f64>> {
    let out = match transform {
        Transform::Identity => values.to_vec(),
        Transform::Lagged(k) => lagged(values, k),
        Transform::MovingAverage(k) => moving_average(values, k),
        Transform::Power(k) => values.iter().map(|v| v.map(|x| x.powi(k))).collect(),
        Transform::Difference(k) => with_lag(values, k, |x, prev| Some(x - prev)),
        Transform::PercentChange(k) => {
            with_lag(values, k, |x, prev| (prev != 0.0).then(|| (x - prev) / prev))
        }
    };
    out.into_iter().map(|v| v.filter(|x| x.is_finite())).collect()
}

/// Return a copy of `frame` with one extra column per regressor, in set order.
pub fn transform_features(
    frame: &TimeSeriesFrame,
    regressors: &RegressorSet,
) -> Result<TimeSeriesFrame, DataError> {
    let mut out = frame.clone();
    for reg in regressors {
        let source = frame.require(&reg.spec.source)?;
        let values = apply_transform(source, reg.spec.transform);
        debug!(
            feature = %reg.name,
            source = %reg.spec.source,
            transform = reg.spec.kind().display_name(),
            observed = values.iter().filter(|v| v.is_some()).count(),
            "built feature column"
        );
        out.push_column(reg.name.clone(), values)?;
    }
    Ok(out)
}

fn lagged(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| if t >= k { values[t - k] } else { None })
        .collect()
}

fn moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|t| {
            if t + 1 < window {
                return None;
            }
            let mut sum = 0.0;
            for v in &values[t + 1 - window..=t] {
                sum += (*v)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}

fn with_lag<F>(values: &[Option<f64>], k: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    (0..values.len())
        .map(|t| {
            if t < k {
                return None;
            }
            match (values[t], values[t - k]) {
                (Some(x), Some(prev)) => f(x, prev),
                _ => None,
            }
        })
        .collect()
}
