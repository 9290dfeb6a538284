//! Interval averaging: resample an irregular series to a fixed cadence with
//! a data-completeness gate.
//!
//! Buckets that fall short of the completeness threshold carry the missing
//! marker, never a zero or an interpolated value, and the output is densely
//! indexed over the full span of the input so downstream alignment can rely
//! on a regular axis.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::error::Result;
use crate::series::{Column, TimeSeries};
use crate::util::{SECS_PER_DAY, SECS_PER_HOUR};

/// Target averaging cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hour,
    Day,
}

impl Interval {
    pub fn seconds(self) -> i64 {
        match self {
            Interval::Hour => SECS_PER_HOUR,
            Interval::Day => SECS_PER_DAY,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }

    /// Truncate a timestamp to the start of its bucket.
    pub fn floor(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let hour_floor = ts
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(ts);
        match self {
            Interval::Hour => hour_floor,
            Interval::Day => hour_floor.with_hour(0).unwrap_or(hour_floor),
        }
    }

    /// Cadence implied by a series' modal timestamp delta: day-or-coarser
    /// spacing reads as daily, anything finer as hourly.
    pub fn from_modal_delta(delta: Duration) -> Interval {
        if delta.num_seconds() >= SECS_PER_DAY {
            Interval::Day
        } else {
            Interval::Hour
        }
    }

    /// Display label used in metric tables ("Hourly"/"Daily").
    pub fn label(self) -> &'static str {
        match self {
            Interval::Hour => "Hourly",
            Interval::Day => "Daily",
        }
    }
}

/// Resample `series` to `interval`, gating each bucket on completeness.
///
/// The expected per-bucket sample count is derived from the input's modal
/// timestamp delta (one bucket-worth of samples at the native cadence). A
/// bucket's mean is kept when its non-missing count reaches
/// `ceil(expected × threshold)`; one sample fewer and the bucket is missing.
/// Text columns take the bucket mode instead of a mean and are not gated.
///
/// The output has one row per bucket from the first to the last bucket of
/// the input span inclusive, with all-missing rows for empty buckets. An
/// empty input produces an empty output with the same column names.
pub fn interval_average(
    series: &TimeSeries,
    interval: Interval,
    threshold: f64,
) -> Result<TimeSeries> {
    if series.is_empty() {
        let mut out = TimeSeries::new(Vec::new())?;
        for (name, col) in series.columns() {
            let empty = match col {
                Column::Numeric(_) => Column::Numeric(Vec::new()),
                Column::Text(_) => Column::Text(Vec::new()),
            };
            match empty {
                Column::Numeric(v) => out.insert_numeric(name, v)?,
                Column::Text(v) => out.insert_text(name, v)?,
            }
        }
        return Ok(out);
    }

    let expected = expected_per_bucket(series, interval);
    let min_count = min_valid_count(expected, threshold);

    let first = interval.floor(series.timestamps()[0]);
    let last = interval.floor(series.timestamps()[series.len() - 1]);
    let n_buckets = ((last - first).num_seconds() / interval.seconds()) as usize + 1;
    let axis: Vec<DateTime<Utc>> = (0..n_buckets)
        .map(|i| first + interval.duration() * i as i32)
        .collect();

    // Row -> bucket assignment; the index is sorted so this is monotone.
    let bucket_of: Vec<usize> = series
        .timestamps()
        .iter()
        .map(|ts| ((interval.floor(*ts) - first).num_seconds() / interval.seconds()) as usize)
        .collect();

    let mut out = TimeSeries::new(axis)?;
    for (name, col) in series.columns() {
        match col {
            Column::Numeric(values) => {
                let mut sums = vec![0.0f64; n_buckets];
                let mut counts = vec![0usize; n_buckets];
                for (row, value) in values.iter().enumerate() {
                    if let Some(v) = value {
                        sums[bucket_of[row]] += v;
                        counts[bucket_of[row]] += 1;
                    }
                }
                let averaged: Vec<Option<f64>> = (0..n_buckets)
                    .map(|b| {
                        if counts[b] >= min_count && counts[b] > 0 {
                            Some(sums[b] / counts[b] as f64)
                        } else {
                            if counts[b] > 0 {
                                tracing::debug!(
                                    column = name,
                                    bucket = b,
                                    count = counts[b],
                                    min_count,
                                    "bucket below completeness threshold"
                                );
                            }
                            None
                        }
                    })
                    .collect();
                out.insert_numeric(name, averaged)?;
            }
            Column::Text(values) => {
                let modes = bucket_modes(values, &bucket_of, n_buckets);
                out.insert_text(name, modes)?;
            }
        }
    }
    Ok(out)
}

/// One bucket-worth of samples at the input's native cadence. A series too
/// short to have a modal delta expects a single sample per bucket.
fn expected_per_bucket(series: &TimeSeries, interval: Interval) -> usize {
    match series.modal_delta() {
        Some(delta) if delta.num_seconds() > 0 => {
            ((interval.seconds() / delta.num_seconds()).max(1)) as usize
        }
        _ => 1,
    }
}

/// Minimum non-missing count for a bucket to be kept. A bucket with exactly
/// `ceil(expected × threshold)` samples is retained; one fewer is discarded.
fn min_valid_count(expected: usize, threshold: f64) -> usize {
    let min = (expected as f64 * threshold).ceil() as usize;
    min.max(1)
}

/// Per-bucket mode of a text column. Ties resolve to the value seen first
/// within the bucket.
fn bucket_modes(
    values: &[Option<String>],
    bucket_of: &[usize],
    n_buckets: usize,
) -> Vec<Option<String>> {
    let mut per_bucket: Vec<Vec<&str>> = vec![Vec::new(); n_buckets];
    for (row, value) in values.iter().enumerate() {
        if let Some(v) = value {
            per_bucket[bucket_of[row]].push(v.as_str());
        }
    }
    per_bucket
        .into_iter()
        .map(|bucket| {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for v in &bucket {
                *counts.entry(v).or_insert(0) += 1;
            }
            let mut best: Option<(&str, usize)> = None;
            for v in &bucket {
                let n = counts[v];
                match best {
                    Some((_, bn)) if n <= bn => {}
                    _ => best = Some((v, n)),
                }
            }
            best.map(|(v, _)| v.to_string())
        })
        .collect()
}
