//! Demo data.
//!
//! - deterministic synthetic macro panel (`sample`)

pub mod sample;

pub use sample::*;
