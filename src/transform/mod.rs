//! Feature transform engine: raw series -> engineered regressors.

pub mod engine;

pub use engine::*;
