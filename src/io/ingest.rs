//! CSV ingest of the data table.
//!
//! Turns a `date,<series>...` CSV into a [`TimeSeriesFrame`]:
//! - a `date` column is required (header match is case-insensitive)
//! - every other column is a numeric series; blank, `NA`, `NaN` and `#N/A`
//!   cells are missing values
//! - dates must be strictly increasing
//!
//! Row problems are fatal here: a forecast panel with a silently dropped month
//! would shift every lag after it.

use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::error::DataError;
use crate::frame::TimeSeriesFrame;

const DATE_HEADER: &str = "date";
const MISSING_MARKERS: [&str; 5] = ["", "na", "nan", "#n/a", "null"];

/// Load a data table from a CSV file.
pub fn load_frame(path: &Path) -> Result<TimeSeriesFrame, DataError> {
    let file = File::open(path)?;
    let frame = read_frame(file)?;
    debug!(
        path = %path.display(),
        rows = frame.len(),
        series = frame.columns().len(),
        "loaded data table"
    );
    Ok(frame)
}

/// Parse a data table from any CSV reader.
pub fn read_frame<R: std::io::Read>(reader: R) -> Result<TimeSeriesFrame, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();
    let date_idx = names
        .iter()
        .position(|n| n.eq_ignore_ascii_case(DATE_HEADER))
        .ok_or(DataError::MissingDateColumn)?;

    let series: Vec<(usize, String)> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .map(|(i, n)| (i, n.clone()))
        .collect();
    if let Some((i, _)) = series.iter().find(|(_, n)| n.is_empty()) {
        return Err(DataError::Parse {
            line: 1,
            message: format!("column {} has an empty header", i + 1),
        });
    }

    let mut dates = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); series.len()];

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != headers.len() {
            return Err(DataError::Parse {
                line,
                message: format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.len()
                ),
            });
        }

        let raw_date = field(&record, date_idx);
        let date = parse_date(raw_date).map_err(|message| DataError::Parse { line, message })?;
        dates.push(date);

        for (slot, (col_idx, name)) in values.iter_mut().zip(&series) {
            let cell = parse_cell(field(&record, *col_idx)).map_err(|message| DataError::Parse {
                line,
                message: format!("{name}: {message}"),
            })?;
            slot.push(cell);
        }
    }

    let mut frame = TimeSeriesFrame::new(dates)?;
    for ((_, name), column) in series.into_iter().zip(values) {
        frame.push_column(name, column)?;
    }
    Ok(frame)
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

fn parse_cell(s: &str) -> Result<Option<f64>, String> {
    let s = s.trim();
    if MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{s}'"))?;
    Ok(if v.is_finite() { Some(v) } else { None })
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO dates are preferred; spreadsheet exports sometimes carry a time part.
    const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, DD/MM/YYYY (optionally with HH:MM:SS)."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_series_and_missing_cells() {
        let csv = "\u{feff}Date,gdp,fci\n\
                   2020-01-31,1.5,NA\n\
                   2020-02-29,,0.25\n\
                   2020-03-31 00:00:00,-2,NaN\n";
        let frame = read_frame(csv.as_bytes()).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.column_names(), vec!["gdp", "fci"]);
        assert_eq!(frame.column("gdp").unwrap(), &[Some(1.5), None, Some(-2.0)]);
        assert_eq!(frame.column("fci").unwrap(), &[None, Some(0.25), None]);
        assert_eq!(
            frame.dates()[2],
            NaiveDate::from_ymd_opt(2020, 3, 31).unwrap()
        );
    }

    #[test]
    fn requires_date_column() {
        let err = read_frame("gdp,fci\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingDateColumn));
    }

    #[test]
    fn rejects_bad_cells_with_line_numbers() {
        let err = read_frame("date,gdp\n2020-01-01,1\n2020-02-01,abc\n".as_bytes()).unwrap_err();
        match err {
            DataError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("gdp"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = read_frame("date,gdp\nyesterday,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 2, .. }));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let err = read_frame("date,gdp\n2020-02-01,1\n2020-01-01,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::NonMonotonicDates { .. }));
    }
}
