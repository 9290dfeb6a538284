//! Cross-sensor mean: the per-timestamp average of a parameter across the
//! healthy members of a deployment group, used as a secondary reference when
//! no independent monitor exists.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::series::TimeSeries;

/// Name of the contributor-count diagnostic column.
pub const CONTRIBUTOR_COLUMN: &str = "contributing_sensors";

/// Row-wise mean of `param` across the non-flagged members of a group,
/// aligned on `axis`.
///
/// Pairing is all-or-nothing: a timestamp gets a mean only when every
/// non-flagged member has a value there; otherwise the cell is missing. The
/// output carries a `contributing_sensors` column recording how many devices
/// contributed per timestamp (equal to the non-flagged member count wherever
/// a mean exists, retained for diagnostics).
pub fn cross_sensor_mean(
    members: &[&TimeSeries],
    flagged: &[bool],
    param: &str,
    axis: &[DateTime<Utc>],
) -> Result<TimeSeries> {
    let healthy: Vec<Vec<Option<f64>>> = members
        .iter()
        .zip(flagged)
        .filter(|(_, f)| !**f)
        .map(|(s, _)| s.reindex(axis).map(|r| r.numeric_or_missing(param).into_owned()))
        .collect::<Result<_>>()?;

    let mut means = Vec::with_capacity(axis.len());
    let mut contributors = Vec::with_capacity(axis.len());
    for row in 0..axis.len() {
        let values: Vec<f64> = healthy.iter().filter_map(|col| col[row]).collect();
        if !healthy.is_empty() && values.len() == healthy.len() {
            means.push(Some(values.iter().sum::<f64>() / values.len() as f64));
            contributors.push(Some(values.len() as f64));
        } else {
            means.push(None);
            contributors.push(Some(0.0));
        }
    }

    let mut out = TimeSeries::new(axis.to_vec())?;
    out.insert_numeric(param, means)?;
    out.insert_numeric(CONTRIBUTOR_COLUMN, contributors)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    fn series(values: Vec<Option<f64>>) -> TimeSeries {
        let idx: Vec<_> = (0..values.len() as i64)
            .map(|i| ts(0) + chrono::Duration::hours(i))
            .collect();
        let mut s = TimeSeries::new(idx).unwrap();
        s.insert_numeric("pm25", values).unwrap();
        s
    }

    #[test]
    fn mean_requires_every_healthy_member() {
        let a = series(vec![Some(10.0), Some(20.0), None]);
        let b = series(vec![Some(14.0), Some(22.0), Some(30.0)]);
        let axis: Vec<_> = (0..3).map(|i| ts(i)).collect();
        let out = cross_sensor_mean(&[&a, &b], &[false, false], "pm25", &axis).unwrap();
        assert_eq!(
            out.numeric("pm25").unwrap(),
            &[Some(12.0), Some(21.0), None]
        );
        assert_eq!(
            out.numeric(CONTRIBUTOR_COLUMN).unwrap(),
            &[Some(2.0), Some(2.0), Some(0.0)]
        );
    }

    #[test]
    fn flagged_members_do_not_gate_or_contribute() {
        let a = series(vec![Some(10.0), Some(20.0)]);
        let b = series(vec![None, None]); // flagged, all-missing
        let axis: Vec<_> = (0..2).map(|i| ts(i)).collect();
        let out = cross_sensor_mean(&[&a, &b], &[false, true], "pm25", &axis).unwrap();
        assert_eq!(out.numeric("pm25").unwrap(), &[Some(10.0), Some(20.0)]);
    }

    #[test]
    fn no_healthy_members_means_all_missing() {
        let a = series(vec![Some(10.0)]);
        let axis = vec![ts(0)];
        let out = cross_sensor_mean(&[&a], &[true], "pm25", &axis).unwrap();
        assert_eq!(out.numeric("pm25").unwrap(), &[None]);
    }
}
