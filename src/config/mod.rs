//! Modeling configuration: the raw record and its validation.
//!
//! - `raw`: serde shape of the configuration source
//! - `validate`: rule checks producing a typed `QuantfitConfig`

pub mod raw;
pub mod validate;

pub use raw::*;
pub use validate::*;
