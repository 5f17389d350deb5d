//! Least squares building blocks.
//!
//! Every quantile-regression iteration solves a weighted problem of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! We scale rows by `sqrt(w_i)` and solve the resulting ordinary least squares
//! problem with SVD, which handles tall design matrices directly.
//! (Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff used for rank decisions.
const RANK_RTOL: f64 = 1e-10;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the weighted problem by scaling rows with `sqrt(w_i)`.
///
/// Weights must be finite and positive.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &[f64],
) -> Option<DVector<f64>> {
    if w.len() != x.nrows() || w.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return None;
    }
    let mut xw = x.clone();
    let mut yw = y.clone();
    for (i, &wi) in w.iter().enumerate() {
        let sw = wi.sqrt();
        for j in 0..xw.ncols() {
            xw[(i, j)] *= sw;
        }
        yw[i] *= sw;
    }
    solve_least_squares(&xw, &yw)
}

/// Numerical rank of `x`.
///
/// Singular values below `max(n, p) * RANK_RTOL * σ_max` count as zero.
pub fn numerical_rank(x: &DMatrix<f64>) -> usize {
    if x.nrows() == 0 || x.ncols() == 0 {
        return 0;
    }
    let svd = x.clone().svd(false, false);
    let sigma_max = svd.singular_values.max();
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return 0;
    }
    let cutoff = x.nrows().max(x.ncols()) as f64 * RANK_RTOL * sigma_max;
    svd.singular_values.iter().filter(|&&s| s > cutoff).count()
}
