//! Result aggregation and terminal reporting.
//!
//! - `aggregate`: pipeline output, coefficient pivot, status text, processing log
//! - `format`: plain-text tables for the terminal

pub mod aggregate;
pub mod format;

pub use aggregate::*;
pub use format::*;
