//! Input/output helpers.
//!
//! - CSV ingest of the data table (`ingest`)
//! - configuration JSON read/write (`config_json`)
//! - result table exports (`export`)

pub mod config_json;
pub mod export;
pub mod ingest;

pub use config_json::*;
pub use export::*;
pub use ingest::*;
