//! `gar-quantfit` library crate.
//!
//! Growth-at-Risk style quantile forecasting: validate a modeling configuration,
//! engineer features from raw series, fit a panel of quantile regressions over
//! quantile levels and forecast horizons, and aggregate the results.
//!
//! The binary (`gar`) is a thin wrapper around this library so the core stays
//! testable without spawning processes.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod frame;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;
pub mod transform;
