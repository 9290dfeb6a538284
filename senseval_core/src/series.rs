//! Time-indexed tables for device and reference data.
//!
//! A [`TimeSeries`] is the engine's only data shape: a non-decreasing
//! timestamp index plus named columns. Numeric columns carry measured
//! parameters; text columns carry metadata (method names, site identity).
//! Missing cells are `None` — never zero, never interpolated.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::error::{EvalError, Result};

/// One named column of a [`TimeSeries`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of non-missing cells.
    pub fn valid_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v.iter().filter(|c| c.is_some()).count(),
            Column::Text(v) => v.iter().filter(|c| c.is_some()).count(),
        }
    }

    fn has_value_at(&self, i: usize) -> bool {
        match self {
            Column::Numeric(v) => v.get(i).is_some_and(Option::is_some),
            Column::Text(v) => v.get(i).is_some_and(Option::is_some),
        }
    }
}

/// A time-indexed table. Rows align 1:1 with `timestamps`; every column has
/// exactly one cell per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    columns: BTreeMap<String, Column>,
}

impl TimeSeries {
    /// Create an empty table over the given index.
    ///
    /// The index must be non-decreasing; ingestion is expected to have sorted
    /// it already.
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Result<Self> {
        if timestamps.windows(2).any(|w| w[0] > w[1]) {
            return Err(EvalError::UnsortedIndex.into());
        }
        Ok(Self {
            timestamps,
            columns: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add a numeric column; its length must match the index.
    pub fn insert_numeric(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<()> {
        self.insert(name.into(), Column::Numeric(values))
    }

    /// Add a text column; its length must match the index.
    pub fn insert_text(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<String>>,
    ) -> Result<()> {
        self.insert(name.into(), Column::Text(values))
    }

    fn insert(&mut self, name: String, col: Column) -> Result<()> {
        if col.len() != self.timestamps.len() {
            return Err(EvalError::ColumnLength {
                column: name,
                expected: self.timestamps.len(),
                actual: col.len(),
            }
            .into());
        }
        self.columns.insert(name, col);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.columns.get(name) {
            Some(Column::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match self.columns.get(name) {
            Some(Column::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Numeric column access with the missing-column substitution policy:
    /// an absent (or non-numeric) column is logged and replaced by an
    /// all-missing column of the right length so alignment never crashes.
    pub fn numeric_or_missing(&self, name: &str) -> Cow<'_, [Option<f64>]> {
        match self.numeric(name) {
            Some(v) => Cow::Borrowed(v),
            None => {
                tracing::warn!(column = name, "column absent, substituting all-missing");
                Cow::Owned(vec![None; self.timestamps.len()])
            }
        }
    }

    /// First non-missing text cell of a metadata column, if any.
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.text(name)?
            .iter()
            .find_map(|c| c.as_deref())
    }

    /// Most common spacing between successive timestamps. Ties break toward
    /// the smaller delta so a half-and-half mix never reports the coarser
    /// cadence.
    pub fn modal_delta(&self) -> Option<Duration> {
        modal_delta_of(&self.timestamps)
    }

    /// First and last row carrying at least one non-missing cell, i.e. the
    /// observed deployment span after fully-empty rows are dropped.
    pub fn observed_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let row_has_value =
            |i: usize| self.columns.values().any(|c| c.has_value_at(i));
        let first = (0..self.len()).find(|&i| row_has_value(i))?;
        let last = (0..self.len()).rev().find(|&i| row_has_value(i))?;
        Some((self.timestamps[first], self.timestamps[last]))
    }

    /// Project every column onto a new index. Rows whose timestamp exists in
    /// `self` keep their values; all other rows are missing. Duplicate source
    /// timestamps resolve to the first occurrence.
    pub fn reindex(&self, axis: &[DateTime<Utc>]) -> Result<TimeSeries> {
        let mut lookup: HashMap<DateTime<Utc>, usize> =
            HashMap::with_capacity(self.timestamps.len());
        for (i, ts) in self.timestamps.iter().enumerate() {
            lookup.entry(*ts).or_insert(i);
        }
        let mut out = TimeSeries::new(axis.to_vec())?;
        for (name, col) in &self.columns {
            let projected = match col {
                Column::Numeric(v) => Column::Numeric(
                    axis.iter()
                        .map(|ts| lookup.get(ts).and_then(|&i| v[i]))
                        .collect(),
                ),
                Column::Text(v) => Column::Text(
                    axis.iter()
                        .map(|ts| lookup.get(ts).and_then(|&i| v[i].clone()))
                        .collect(),
                ),
            };
            out.insert(name.clone(), projected)?;
        }
        Ok(out)
    }
}

/// Modal spacing of a timestamp sequence; `None` for sequences shorter
/// than two points.
pub fn modal_delta_of(timestamps: &[DateTime<Utc>]) -> Option<Duration> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for w in timestamps.windows(2) {
        let secs = (w[1] - w[0]).num_seconds();
        if secs > 0 {
            *counts.entry(secs).or_insert(0) += 1;
        }
    }
    // BTreeMap iteration is ascending by delta, so strict > keeps the
    // smallest delta on ties.
    let (secs, _) = counts
        .into_iter()
        .fold(None::<(i64, usize)>, |best, (secs, n)| match best {
            Some((_, bn)) if n <= bn => best,
            _ => Some((secs, n)),
        })?;
    Some(Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn rejects_unsorted_index() {
        let err = TimeSeries::new(vec![ts(2, 0), ts(1, 0)]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_column_length_mismatch() {
        let mut s = TimeSeries::new(vec![ts(0, 0), ts(1, 0)]).unwrap();
        let err = s.insert_numeric("pm25", vec![Some(1.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn modal_delta_prefers_most_common_then_smallest() {
        // Three 5-minute gaps, one 10-minute gap.
        let idx = vec![ts(0, 0), ts(0, 5), ts(0, 10), ts(0, 20), ts(0, 25)];
        let s = TimeSeries::new(idx).unwrap();
        assert_eq!(s.modal_delta(), Some(Duration::minutes(5)));

        // Tie: one 5-minute gap, one 10-minute gap -> smaller wins.
        let s = TimeSeries::new(vec![ts(0, 0), ts(0, 5), ts(0, 15)]).unwrap();
        assert_eq!(s.modal_delta(), Some(Duration::minutes(5)));
    }

    #[test]
    fn observed_span_skips_fully_empty_rows() {
        let mut s =
            TimeSeries::new(vec![ts(0, 0), ts(1, 0), ts(2, 0), ts(3, 0)]).unwrap();
        s.insert_numeric("pm25", vec![None, Some(3.0), Some(4.0), None])
            .unwrap();
        s.insert_numeric("temp", vec![None, None, Some(21.0), None])
            .unwrap();
        assert_eq!(s.observed_span(), Some((ts(1, 0), ts(2, 0))));
    }

    #[test]
    fn reindex_fills_unmatched_rows_with_missing() {
        let mut s = TimeSeries::new(vec![ts(0, 0), ts(2, 0)]).unwrap();
        s.insert_numeric("pm25", vec![Some(1.0), Some(2.0)]).unwrap();
        let axis = vec![ts(0, 0), ts(1, 0), ts(2, 0)];
        let r = s.reindex(&axis).unwrap();
        assert_eq!(r.numeric("pm25").unwrap(), &[Some(1.0), None, Some(2.0)]);
    }

    #[test]
    fn missing_column_substitution_matches_index_length() {
        let s = TimeSeries::new(vec![ts(0, 0), ts(1, 0)]).unwrap();
        let col = s.numeric_or_missing("no_such_param");
        assert_eq!(col.len(), 2);
        assert!(col.iter().all(Option::is_none));
    }
}
