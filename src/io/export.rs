//! Export result tables to CSV.
//!
//! One file per output destination, named after the destination
//! (`Quant reg coefficients` -> `quant_reg_coefficients.csv`), plus the
//! augmented feature frame, the fit diagnostics and the processing log.
//! Missing values are empty cells.
//!
//! The `input` destination names the data table the run read from, so the
//! feature frame goes to its own file. No export may land on a protected
//! path such as the `--data` file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::{CoefficientRow, ConditionalQuantileRow, FitDiagnostic};
use crate::error::{AppError, EXIT_IO};
use crate::frame::TimeSeriesFrame;
use crate::report::{LogEntry, PipelineOutput};

pub const FEATURES_FILE: &str = "features.csv";
pub const DIAGNOSTICS_FILE: &str = "fit_diagnostics.csv";
pub const PROCESSING_LOG_FILE: &str = "processing_log.csv";

const COEFFICIENT_HEADER: [&str; 4] = ["quantile", "horizon", "feature", "coefficient"];
const CONDITIONAL_HEADER: [&str; 4] = ["quantile", "horizon", "date", "value"];
const DIAGNOSTIC_HEADER: [&str; 6] = [
    "quantile",
    "horizon",
    "n_obs",
    "iterations",
    "check_loss",
    "status",
];
const LOG_HEADER: [&str; 2] = ["time", "action"];

/// File name for an output destination.
pub fn destination_file_name(destination: &str) -> String {
    let mut stem = String::with_capacity(destination.len());
    for ch in destination.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch.to_ascii_lowercase());
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "output.csv".to_string()
    } else {
        format!("{stem}.csv")
    }
}

/// Write every result table of a run into `dir`, returning the written paths.
///
/// Nothing is written when a target path is one of `protected` or when two
/// destinations map to the same file.
pub fn write_outputs(
    dir: &Path,
    output: &PipelineOutput,
    protected: &[&Path],
) -> Result<Vec<PathBuf>, AppError> {
    let dest = &output.destinations;
    let targets = [
        dir.join(FEATURES_FILE),
        dir.join(destination_file_name(&dest.quantreg)),
        dir.join(destination_file_name(&dest.cond_quant)),
        dir.join(destination_file_name(&dest.local_projection)),
        dir.join(DIAGNOSTICS_FILE),
        dir.join(PROCESSING_LOG_FILE),
    ];
    check_targets(&targets, protected)?;

    fs::create_dir_all(dir).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to create output directory '{}': {e}", dir.display()),
        )
    })?;

    let [features, quantreg, cond_quant, local_projection, diagnostics, log] = targets;
    write_file(&features, |w| write_frame_csv(w, &output.frame))?;
    write_file(&quantreg, |w| write_coefficients_csv(w, &output.coefficients.rows))?;
    write_file(&cond_quant, |w| {
        write_conditional_quantiles_csv(w, &output.conditional_quantiles.rows)
    })?;
    write_file(&local_projection, |w| {
        write_coefficients_csv(w, &output.local_projections.rows)
    })?;
    write_file(&diagnostics, |w| write_diagnostics_csv(w, &output.diagnostics))?;
    write_file(&log, |w| write_log_csv(w, &output.log.entries))?;

    let written = vec![features, quantreg, cond_quant, local_projection, diagnostics, log];
    info!(dir = %dir.display(), files = written.len(), "wrote result tables");
    Ok(written)
}

fn check_targets(targets: &[PathBuf], protected: &[&Path]) -> Result<(), AppError> {
    for (i, target) in targets.iter().enumerate() {
        if let Some(p) = protected.iter().find(|p| same_file(target, p)) {
            return Err(AppError::new(
                EXIT_IO,
                format!(
                    "Refusing to overwrite '{}' with export '{}'.",
                    p.display(),
                    target.display()
                ),
            ));
        }
        if targets[..i].contains(target) {
            return Err(AppError::new(
                EXIT_IO,
                format!("Two exports map to the same file '{}'.", target.display()),
            ));
        }
    }
    Ok(())
}

/// Existing files compare by canonical path, anything else literally.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub fn write_coefficients_csv<W: Write>(w: W, rows: &[CoefficientRow]) -> csv::Result<()> {
    write_table(w, &COEFFICIENT_HEADER, rows)
}

pub fn write_conditional_quantiles_csv<W: Write>(
    w: W,
    rows: &[ConditionalQuantileRow],
) -> csv::Result<()> {
    write_table(w, &CONDITIONAL_HEADER, rows)
}

pub fn write_diagnostics_csv<W: Write>(w: W, rows: &[FitDiagnostic]) -> csv::Result<()> {
    write_table(w, &DIAGNOSTIC_HEADER, rows)
}

pub fn write_log_csv<W: Write>(w: W, rows: &[LogEntry]) -> csv::Result<()> {
    write_table(w, &LOG_HEADER, rows)
}

/// Date index followed by every column in frame order.
pub fn write_frame_csv<W: Write>(w: W, frame: &TimeSeriesFrame) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    let mut header = vec!["date".to_string()];
    header.extend(frame.column_names().into_iter().map(str::to_string));
    wtr.write_record(&header)?;

    for (t, date) in frame.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.to_string());
        for col in frame.columns() {
            record.push(col.values[t].map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_table<W: Write, T: Serialize>(w: W, header: &[&str], rows: &[T]) -> csv::Result<()> {
    // Explicit header so empty tables still carry their column set.
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(header)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_file(
    path: &Path,
    write: impl FnOnce(fs::File) -> csv::Result<()>,
) -> Result<(), AppError> {
    let file = fs::File::create(path).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;
    write(file).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to write export CSV '{}': {e}", path.display()),
        )
    })
}
