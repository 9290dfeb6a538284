//! Deployment periods and deployment groups.
//!
//! A deployment group is a cluster of devices whose observed start
//! timestamps fall within the configured tolerance of one another. Grouping
//! is fuzzy on purpose: field deployments rarely start at the same instant
//! across units, so a tolerance window absorbs staggered installation while
//! still separating distinct campaigns.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::average::Interval;
use crate::error::{EvalError, Result};
use crate::series::TimeSeries;
use crate::uptime::{uptime, Uptime};
use crate::util::humanize_duration;

/// Observed start/end of one device's raw series, fully-empty rows dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: Duration,
}

/// First/last row carrying any value; `None` when the series has no data.
pub fn extract_period(series: &TimeSeries) -> Option<DeploymentPeriod> {
    let (start, end) = series.observed_span()?;
    Some(DeploymentPeriod {
        start,
        end,
        duration: end - start,
    })
}

/// One device's membership in a deployment group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    /// Index into the session's device ordering.
    pub device: usize,
    pub period: DeploymentPeriod,
    /// True when this device's end date differs from the group's modal end
    /// date. Flagged members stay in the group; exclusion decisions belong
    /// to the consumers of this flag.
    pub deploy_issues: bool,
    /// Modal sampling interval of the raw series, humanized ("5 minutes").
    pub recording_interval: String,
    /// Uptime over the group's canonical window at each cadence.
    pub uptime_hourly: Uptime,
    pub uptime_daily: Uptime,
}

/// A cluster of concurrently tested devices.
#[derive(Debug, Clone)]
pub struct DeploymentGroup {
    /// Sequential, 1-based, in pool-traversal order.
    pub number: usize,
    /// Latest member start: statistics only use truly-concurrent data.
    pub start: DateTime<Utc>,
    /// Earliest member end, same rationale.
    pub end: DateTime<Utc>,
    pub duration: Duration,
    pub members: Vec<GroupMember>,
}

impl DeploymentGroup {
    pub fn label(&self) -> String {
        format!("Group {}", self.number)
    }

    pub fn member_devices(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|m| m.device)
    }
}

/// Cluster devices into deployment groups.
///
/// `raw`, `hourly` and `daily` are per-device series in the session's device
/// order (`hourly`/`daily` are the averaged derivatives used for uptime).
/// Devices with entirely-empty raw series are logged and left out of every
/// group. An empty pool is a hard configuration error.
pub fn group_deployments(
    raw: &[TimeSeries],
    hourly: &[TimeSeries],
    daily: &[TimeSeries],
    start_tolerance: Duration,
) -> Result<Vec<DeploymentGroup>> {
    if raw.is_empty() {
        return Err(EvalError::EmptyDevicePool.into());
    }
    if hourly.len() != raw.len() || daily.len() != raw.len() {
        return Err(EvalError::DeviceCountMismatch {
            serials: raw.len(),
            series: hourly.len().min(daily.len()),
        }
        .into());
    }

    let mut pool: Vec<(usize, DeploymentPeriod)> = Vec::new();
    for (device, series) in raw.iter().enumerate() {
        match extract_period(series) {
            Some(period) => pool.push((device, period)),
            None => tracing::warn!(device, "no observed data, excluded from grouping"),
        }
    }

    let mut groups = Vec::new();
    let mut number = 0;
    while let Some(&(_, seed)) = pool.first() {
        number += 1;
        let (matched, rest): (Vec<_>, Vec<_>) = pool
            .iter()
            .copied()
            .partition(|(_, p)| abs_delta(p.start, seed.start) <= start_tolerance);
        pool = rest;

        let start = matched
            .iter()
            .map(|(_, p)| p.start)
            .max()
            .unwrap_or(seed.start);
        let end = matched
            .iter()
            .map(|(_, p)| p.end)
            .min()
            .unwrap_or(seed.end);
        let modal_end = modal_end_date(matched.iter().map(|(_, p)| p.end));

        let members = matched
            .into_iter()
            .map(|(device, period)| {
                let deploy_issues = period.end.date_naive() != modal_end;
                if deploy_issues {
                    tracing::debug!(device, group = number, "end date off the group mode");
                }
                GroupMember {
                    device,
                    period,
                    deploy_issues,
                    recording_interval: recording_interval(&raw[device]),
                    uptime_hourly: uptime(&hourly[device], Interval::Hour, start, end),
                    uptime_daily: uptime(&daily[device], Interval::Day, start, end),
                }
            })
            .collect();

        tracing::debug!(group = number, "deployment group formed");
        groups.push(DeploymentGroup {
            number,
            start,
            end,
            duration: end - start,
            members,
        });
    }
    Ok(groups)
}

fn abs_delta(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b { a - b } else { b - a }
}

/// Most common end date of a set of member ends; frequency ties resolve to
/// the earlier date.
fn modal_end_date(ends: impl Iterator<Item = DateTime<Utc>>) -> NaiveDate {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for end in ends {
        *counts.entry(end.date_naive()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .fold(None::<(NaiveDate, usize)>, |best, (date, n)| match best {
            Some((_, bn)) if n <= bn => best,
            _ => Some((date, n)),
        })
        .map(|(date, _)| date)
        .unwrap_or_default()
}

/// Humanized modal sampling interval of a raw series ("unknown" when the
/// series is too short to estimate one).
fn recording_interval(series: &TimeSeries) -> String {
    match series.modal_delta() {
        Some(delta) => humanize_duration(delta),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, h, 0, 0).unwrap()
    }

    fn device(start: DateTime<Utc>, hours: usize) -> TimeSeries {
        let idx: Vec<_> = (0..hours as i64)
            .map(|i| start + Duration::hours(i))
            .collect();
        let mut s = TimeSeries::new(idx).unwrap();
        s.insert_numeric("pm25", vec![Some(10.0); hours]).unwrap();
        s
    }

    fn run_grouping(raw: Vec<TimeSeries>) -> Vec<DeploymentGroup> {
        let hourly: Vec<_> = raw
            .iter()
            .map(|s| crate::average::interval_average(s, Interval::Hour, 0.75).unwrap())
            .collect();
        let daily: Vec<_> = raw
            .iter()
            .map(|s| crate::average::interval_average(s, Interval::Day, 0.75).unwrap())
            .collect();
        group_deployments(&raw, &hourly, &daily, Duration::days(1)).unwrap()
    }

    #[test]
    fn concurrent_starts_form_one_group() {
        let groups = run_grouping(vec![
            device(ts(1, 0), 48),
            device(ts(1, 2), 46),
            device(ts(1, 1), 47),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
        assert_eq!(groups[0].number, 1);
    }

    #[test]
    fn canonical_window_is_the_intersection() {
        let groups = run_grouping(vec![device(ts(1, 0), 48), device(ts(1, 2), 48)]);
        let g = &groups[0];
        // starts 00:00 and 02:00 -> canonical start is the later
        assert_eq!(g.start, ts(1, 2));
        // ends 47h and 49h after day start -> canonical end is the earlier
        assert_eq!(g.end, ts(2, 23));
    }

    #[test]
    fn distant_starts_split_into_groups() {
        let groups = run_grouping(vec![device(ts(1, 0), 24), device(ts(10, 0), 24)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].number, 1);
        assert_eq!(groups[1].number, 2);
    }

    #[test]
    fn early_stop_sets_deploy_issues_without_exclusion() {
        // Third device ends two days before the other two.
        let groups = run_grouping(vec![
            device(ts(1, 0), 96),
            device(ts(1, 0), 96),
            device(ts(1, 0), 48),
        ]);
        let g = &groups[0];
        assert_eq!(g.members.len(), 3);
        assert!(!g.members[0].deploy_issues);
        assert!(!g.members[1].deploy_issues);
        assert!(g.members[2].deploy_issues);
    }

    #[test]
    fn recording_interval_is_humanized_modal_delta() {
        let groups = run_grouping(vec![device(ts(1, 0), 24)]);
        assert_eq!(groups[0].members[0].recording_interval, "1 hour");
    }

    #[test]
    fn empty_pool_is_a_hard_error() {
        let err = group_deployments(&[], &[], &[], Duration::days(1));
        assert!(err.is_err());
    }
}
