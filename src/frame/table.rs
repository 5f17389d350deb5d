//! Date-indexed table of named series.
//!
//! Values are `Option<f64>`: `None` is an explicit missing observation. Non-finite
//! numbers never enter the table; [`TimeSeriesFrame::push_column`] maps them to `None`.

use chrono::NaiveDate;

use crate::error::DataError;

/// One named series aligned to the frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// A table with a strictly increasing date index and ordered columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl TimeSeriesFrame {
    /// Create an empty frame over `dates`.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, DataError> {
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DataError::NonMonotonicDates {
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self {
            dates,
            columns: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Like [`TimeSeriesFrame::column`], but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<&[Option<f64>], DataError> {
        self.column(name)
            .ok_or_else(|| DataError::UnknownSeries(name.to_string()))
    }

    /// Append a new column. Names must be unique.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), DataError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        self.check_len(&name, values.len())?;
        self.columns.push(Column {
            name,
            values: sanitize(values),
        });
        Ok(())
    }

    /// Insert a column, replacing any existing column of the same name in place.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), DataError> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        let values = sanitize(values);
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Indices of rows where every named column is observed.
    pub fn complete_rows(&self, names: &[&str]) -> Result<Vec<usize>, DataError> {
        let cols = names
            .iter()
            .map(|n| self.require(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..self.len())
            .filter(|&t| cols.iter().all(|c| c[t].is_some()))
            .collect())
    }

    /// Most recent row where every named column is observed.
    pub fn last_complete_row(&self, names: &[&str]) -> Result<Option<usize>, DataError> {
        Ok(self.complete_rows(names)?.last().copied())
    }

    fn check_len(&self, name: &str, got: usize) -> Result<(), DataError> {
        if got != self.len() {
            return Err(DataError::LengthMismatch {
                name: name.to_string(),
                expected: self.len(),
                got,
            });
        }
        Ok(())
    }
}

fn sanitize(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        (0..n)
            .map(|i| start + chrono::Months::new(i as u32))
            .collect()
    }

    #[test]
    fn rejects_non_monotonic_index() {
        let mut dates = monthly(3);
        dates.swap(1, 2);
        assert!(matches!(
            TimeSeriesFrame::new(dates),
            Err(DataError::NonMonotonicDates { .. })
        ));
    }

    #[test]
    fn push_column_checks_length_and_duplicates() {
        let mut frame = TimeSeriesFrame::new(monthly(3)).unwrap();
        frame.push_column("x", vec![Some(1.0), None, Some(3.0)]).unwrap();
        assert!(matches!(
            frame.push_column("x", vec![None, None, None]),
            Err(DataError::DuplicateColumn(_))
        ));
        assert!(matches!(
            frame.push_column("y", vec![None]),
            Err(DataError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_values_become_missing() {
        let mut frame = TimeSeriesFrame::new(monthly(3)).unwrap();
        frame
            .push_column("x", vec![Some(f64::NAN), Some(f64::INFINITY), Some(2.0)])
            .unwrap();
        assert_eq!(frame.column("x").unwrap(), &[None, None, Some(2.0)]);
    }

    #[test]
    fn complete_rows_require_all_columns() {
        let mut frame = TimeSeriesFrame::new(monthly(4)).unwrap();
        frame
            .push_column("a", vec![None, Some(1.0), Some(2.0), Some(3.0)])
            .unwrap();
        frame
            .push_column("b", vec![Some(1.0), Some(1.0), None, Some(3.0)])
            .unwrap();
        assert_eq!(frame.complete_rows(&["a", "b"]).unwrap(), vec![1, 3]);
        assert_eq!(frame.last_complete_row(&["a", "b"]).unwrap(), Some(3));
        assert!(frame.complete_rows(&["missing"]).is_err());
    }

    #[test]
    fn set_column_replaces_in_place() {
        let mut frame = TimeSeriesFrame::new(monthly(2)).unwrap();
        frame.push_column("a", vec![Some(1.0), Some(2.0)]).unwrap();
        frame.push_column("b", vec![Some(1.0), Some(2.0)]).unwrap();
        frame.set_column("a", vec![None, Some(5.0)]).unwrap();
        assert_eq!(frame.column_names(), vec!["a", "b"]);
        assert_eq!(frame.column("a").unwrap(), &[None, Some(5.0)]);
    }
}
