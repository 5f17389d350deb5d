//! Quantile regression driver.
//!
//! - `sample`: horizon-shifted targets and per-horizon estimation samples
//! - `driver`: parallel (quantile × horizon) fan-out and result assembly

pub mod driver;
pub mod sample;

pub use driver::*;
pub use sample::*;
