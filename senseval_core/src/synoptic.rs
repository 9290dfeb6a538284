//! Synoptic index: the common, regularly-spaced timestamp axis every
//! cross-series computation aligns onto before pairing values.

use chrono::{DateTime, Utc};

use crate::average::Interval;
use crate::error::{EvalError, Result};
use crate::series::TimeSeries;

/// Build the common timestamp axis spanning a set of series that share a
/// sampling cadence.
///
/// The cadence (hourly vs daily) is decided by the modal timestamp delta of
/// the first series; the axis runs from the bucket of the globally earliest
/// timestamp to the bucket of the globally latest, one entry per interval.
/// Series without any rows contribute nothing to the span.
pub fn synoptic_index(series: &[&TimeSeries]) -> Result<Vec<DateTime<Utc>>> {
    let first = series
        .first()
        .ok_or_else(|| EvalError::Config("synoptic index needs at least one series".into()))?;
    let interval = match first.modal_delta() {
        Some(delta) => Interval::from_modal_delta(delta),
        None => {
            tracing::debug!("first series too short for a modal delta, assuming hourly");
            Interval::Hour
        }
    };

    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;
    for s in series {
        if let (Some(&start), Some(&end)) = (s.timestamps().first(), s.timestamps().last()) {
            earliest = Some(earliest.map_or(start, |e| e.min(start)));
            latest = Some(latest.map_or(end, |l| l.max(end)));
        }
    }
    let (Some(earliest), Some(latest)) = (earliest, latest) else {
        return Ok(Vec::new());
    };

    Ok(regular_axis(interval, earliest, latest))
}

/// Regular axis at `interval` covering [start, end] by bucket.
pub fn regular_axis(
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let first = interval.floor(start);
    let last = interval.floor(end);
    if last < first {
        return Vec::new();
    }
    let n = ((last - first).num_seconds() / interval.seconds()) as usize + 1;
    (0..n)
        .map(|i| first + interval.duration() * i as i32)
        .collect()
}
