//! Time-indexed tabular data.

pub mod table;

pub use table::*;
