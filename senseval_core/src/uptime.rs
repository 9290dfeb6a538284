//! Uptime: percent of expected samples actually present over an
//! evaluation window.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::average::Interval;
use crate::series::{Column, TimeSeries};
use crate::util::round3;

/// Uptime over one window for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uptime {
    /// Percent of expected samples present, rounded to 3 decimals.
    pub percent: f64,
    /// Non-missing sample count (modal across columns).
    pub present: usize,
    /// Missing sample count (`expected - present`).
    pub missing: usize,
    /// Samples the regular cadence implies for the window.
    pub expected: usize,
}

/// Compute uptime of an already-averaged series restricted to
/// `[start, end]` at the given cadence.
///
/// The per-column non-missing counts are reduced to their modal value so a
/// one-off gap in a single column does not drag the whole series' uptime
/// down. Ties between equally common counts resolve to the larger count.
pub fn uptime(
    series: &TimeSeries,
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Uptime {
    let lo = interval.floor(start);
    let hi = interval.floor(end);
    let expected = if hi < lo {
        0
    } else {
        ((hi - lo).num_seconds() / interval.seconds()) as usize + 1
    };

    let in_window: Vec<usize> = series
        .timestamps()
        .iter()
        .enumerate()
        .filter(|(_, ts)| **ts >= lo && **ts <= hi)
        .map(|(i, _)| i)
        .collect();

    let mut count_freq: BTreeMap<usize, usize> = BTreeMap::new();
    for (_, col) in series.columns() {
        let n = in_window
            .iter()
            .filter(|&&i| col_has_value(col, i))
            .count();
        *count_freq.entry(n).or_insert(0) += 1;
    }
    // Ascending iteration plus >= keeps the larger count on frequency ties.
    let present = count_freq
        .into_iter()
        .fold(None::<(usize, usize)>, |best, (count, freq)| match best {
            Some((_, bf)) if freq < bf => best,
            _ => Some((count, freq)),
        })
        .map_or(0, |(count, _)| count);

    let percent = if expected == 0 {
        0.0
    } else {
        round3(present as f64 / expected as f64 * 100.0)
    };
    Uptime {
        percent,
        present,
        missing: expected.saturating_sub(present),
        expected,
    }
}

fn col_has_value(col: &Column, i: usize) -> bool {
    match col {
        Column::Numeric(v) => v.get(i).is_some_and(Option::is_some),
        Column::Text(v) => v.get(i).is_some_and(Option::is_some),
    }
}
