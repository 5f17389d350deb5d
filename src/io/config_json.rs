//! Read/write configuration JSON files.
//!
//! The file holds a [`RawConfig`]; validation happens afterwards, so a file that
//! parses can still be rejected by the configuration rules.

use std::fs::File;
use std::path::Path;

use crate::config::RawConfig;
use crate::error::{AppError, EXIT_CONFIG, EXIT_IO};

/// Read a configuration JSON file.
pub fn read_config_json(path: &Path) -> Result<RawConfig, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to open config JSON '{}': {e}", path.display()),
        )
    })?;
    parse_config_json(file).map_err(|e| {
        AppError::new(
            EXIT_CONFIG,
            format!("Invalid config JSON '{}': {e}", path.display()),
        )
    })
}

/// Parse a configuration from any JSON reader.
pub fn parse_config_json<R: std::io::Read>(reader: R) -> Result<RawConfig, serde_json::Error> {
    serde_json::from_reader(reader)
}

/// Write a configuration JSON file.
pub fn write_config_json(path: &Path, config: &RawConfig) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to create config JSON '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer_pretty(file, config)
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to write config JSON: {e}")))?;
    Ok(())
}
