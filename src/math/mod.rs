//! Numerical routines: least squares and linear quantile regression.

pub mod ols;
pub mod quantreg;

pub use ols::*;
pub use quantreg::*;
