//! Linear quantile regression.
//!
//! The driver only depends on the [`QuantileSolver`] trait. The shipped solver is
//! iteratively reweighted least squares on the check loss
//!
//! ```text
//! ρ_q(r) = r * (q - 1{r < 0})
//! ```
//!
//! - start from the OLS fit
//! - reweight each observation by `q/|r|` (above the fit) or `(1-q)/|r|` (below)
//! - re-solve the weighted least squares problem
//! - stop once the largest coefficient change is below `tolerance`
//!
//! Residual magnitudes are floored at `RESID_FLOOR` so observations sitting on
//! the fitted hyperplane do not get infinite weight.

use nalgebra::{DMatrix, DVector};

use crate::error::EstimationError;
use crate::math::ols::{numerical_rank, solve_least_squares, solve_weighted_least_squares};

/// Floor on `|r_i|` when forming IRLS weights.
const RESID_FLOOR: f64 = 1e-6;

/// A fitted linear quantile model.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileFit {
    pub quantile: f64,
    /// Intercept first, then one coefficient per design column after it.
    pub coefficients: Vec<f64>,
    pub iterations: usize,
    pub check_loss: f64,
    pub n_obs: usize,
}

impl QuantileFit {
    /// Evaluate the model at a full design row (including the leading `1.0`).
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(row.iter())
            .map(|(b, x)| b * x)
            .sum()
    }
}

/// Quantile-regression fitting capability.
///
/// `x` is the full design matrix (intercept column included), `y` the response.
/// Implementations must be safe to call from several threads at once.
pub trait QuantileSolver: Sync {
    fn fit(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        quantile: f64,
    ) -> Result<QuantileFit, EstimationError>;
}

/// IRLS quantile regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrlsSolver {
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for IrlsSolver {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            tolerance: 1e-6,
        }
    }
}

impl QuantileSolver for IrlsSolver {
    fn fit(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        quantile: f64,
    ) -> Result<QuantileFit, EstimationError> {
        let n = x.nrows();
        let p = x.ncols();
        if n == 0 {
            return Err(EstimationError::EmptySample);
        }
        if n < p {
            return Err(EstimationError::InsufficientSample {
                n_obs: n,
                n_params: p,
            });
        }
        if numerical_rank(x) < p {
            return Err(EstimationError::SingularDesign);
        }

        let mut beta = solve_least_squares(x, y).ok_or(EstimationError::SingularDesign)?;
        let mut weights = vec![1.0; n];

        for iter in 1..=self.max_iter {
            let residuals = y - x * &beta;
            for (w, &r) in weights.iter_mut().zip(residuals.iter()) {
                let side = if r > 0.0 { quantile } else { 1.0 - quantile };
                *w = side / r.abs().max(RESID_FLOOR);
            }

            let next = solve_weighted_least_squares(x, y, &weights)
                .ok_or(EstimationError::SingularDesign)?;
            let change = (&next - &beta).amax();
            beta = next;

            if change < self.tolerance {
                let residuals = y - x * &beta;
                return Ok(QuantileFit {
                    quantile,
                    coefficients: beta.iter().copied().collect(),
                    iterations: iter,
                    check_loss: check_loss(residuals.as_slice(), quantile),
                    n_obs: n,
                });
            }
        }

        Err(EstimationError::NotConverged {
            iterations: self.max_iter,
        })
    }
}

/// Total check loss `Σ ρ_q(r_i)`.
pub fn check_loss(residuals: &[f64], quantile: f64) -> f64 {
    residuals
        .iter()
        .map(|&r| if r < 0.0 { (quantile - 1.0) * r } else { quantile * r })
        .sum()
}
