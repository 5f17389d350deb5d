//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - regressor declarations (`TransformKind`, `Transform`, `TransformSpec`, `RegressorSet`)
//! - quantile and horizon configuration (`QuantileSet`, `HorizonRange`)
//! - fit outputs (`QuantileRegressionResult`, `ConditionalQuantileEstimate`,
//!   `LocalProjectionResult`, `FitOutcome`)

pub mod types;

pub use types::*;
