//! Evaluation session: the strict linear pipeline Grouping →
//! Averaging/Alignment → Uptime/Regression/Error/Precision → Aggregation.
//!
//! A session owns already-materialized tables only; any file or network
//! access happened upstream. All configuration is passed explicitly at
//! construction, never held as ambient state.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use senseval_config::Config;

use crate::average::{interval_average, Interval};
use crate::deployment::{group_deployments, DeploymentGroup};
use crate::error::{EvalError, Result};
use crate::intersensor::cross_sensor_mean;
use crate::metrics::{metric_average_row, MetricRecord};
use crate::series::TimeSeries;
use crate::stats::{group_error, group_precision, regress};
use crate::summary::{
    ByInterval, DeploymentSummary, ErrorStats, GroupSummary, MetCounts, ParamClass,
    ParamSummary, PrecisionStats, RefStats, SensorEntry,
};
use crate::synoptic::synoptic_index;
use crate::util::humanize_duration;

/// Metadata column carrying the reference method name.
pub const METHOD_COLUMN: &str = "method";
/// Metadata column carrying the reference site identity.
pub const SITE_COLUMN: &str = "site";
/// Value columns of a meteorological reference table.
pub const TEMP_COLUMN: &str = "temp";
pub const RH_COLUMN: &str = "rh";
/// Reference name reported when no independent monitor exists for a class.
pub const INTERSENSOR_REFERENCE: &str = "Intersensor Mean";

/// One device under evaluation, in session order.
#[derive(Debug, Clone)]
pub struct DeviceInput {
    /// Device-number string ("1", "2", ...); defines the stable ordering
    /// used everywhere devices are enumerated.
    pub number: String,
    pub serial: String,
    pub raw: TimeSeries,
}

/// An independent reference table for one parameter classification, at
/// hourly cadence. Value columns are named after the parameters they cover;
/// `method`/`site` text columns carry identity metadata.
#[derive(Debug, Clone)]
pub struct ReferenceInput {
    pub class: ParamClass,
    pub hourly: TimeSeries,
}

/// A parameter to evaluate, with its classification.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub class: ParamClass,
}

/// Everything an evaluation produces.
#[derive(Debug, Clone)]
pub struct EvalOutput {
    pub summary: DeploymentSummary,
    pub metrics: Vec<MetricRecord>,
}

pub struct EvalSession {
    sensor_name: String,
    devices: Vec<DeviceInput>,
    references: Vec<ReferenceInput>,
    params: Vec<ParamSpec>,
    config: Config,
}

impl EvalSession {
    /// Validate preconditions and construct a session.
    pub fn new(
        sensor_name: impl Into<String>,
        devices: Vec<DeviceInput>,
        references: Vec<ReferenceInput>,
        params: Vec<ParamSpec>,
        config: Config,
    ) -> Result<Self> {
        if devices.is_empty() {
            return Err(EvalError::EmptyDevicePool.into());
        }
        config
            .validate()
            .map_err(|e| EvalError::Config(e.to_string()))?;
        Ok(Self {
            sensor_name: sensor_name.into(),
            devices,
            references,
            params,
            config,
        })
    }

    /// Run the pipeline: one summary plus the flat metric table.
    pub fn run(&self) -> Result<EvalOutput> {
        let threshold = self.config.averaging.completeness_threshold;

        // Averaged derivatives: hourly from raw, daily from hourly.
        let raw: Vec<TimeSeries> = self.devices.iter().map(|d| d.raw.clone()).collect();
        let hourly: Vec<TimeSeries> = raw
            .iter()
            .map(|s| interval_average(s, Interval::Hour, threshold))
            .collect::<Result<_>>()?;
        let daily: Vec<TimeSeries> = hourly
            .iter()
            .map(|s| interval_average(s, Interval::Day, threshold))
            .collect::<Result<_>>()?;

        let tolerance = Duration::hours(i64::from(self.config.grouping.start_tolerance_hours));
        let groups = group_deployments(&raw, &hourly, &daily, tolerance)?;

        let references: Vec<(ParamClass, ByInterval<TimeSeries>)> = self
            .references
            .iter()
            .map(|r| {
                let daily_ref = interval_average(&r.hourly, Interval::Day, threshold)?;
                Ok((
                    r.class,
                    ByInterval {
                        hourly: Some(r.hourly.clone()),
                        daily: Some(daily_ref),
                    },
                ))
            })
            .collect::<Result<_>>()?;

        let mut metrics = Vec::new();
        let mut group_summaries = BTreeMap::new();
        for group in &groups {
            let summary = self.evaluate_group(
                group,
                &hourly,
                &daily,
                &references,
                &mut metrics,
            )?;
            group_summaries.insert(group.label(), summary);
        }

        Ok(EvalOutput {
            summary: DeploymentSummary {
                sensor_name: self.sensor_name.clone(),
                groups: group_summaries,
            },
            metrics,
        })
    }

    fn evaluate_group(
        &self,
        group: &DeploymentGroup,
        hourly: &[TimeSeries],
        daily: &[TimeSeries],
        references: &[(ParamClass, ByInterval<TimeSeries>)],
        metrics: &mut Vec<MetricRecord>,
    ) -> Result<GroupSummary> {
        let mut sensors = BTreeMap::new();
        for member in &group.members {
            let device = &self.devices[member.device];
            sensors.insert(
                device.number.clone(),
                SensorEntry {
                    serial_id: device.serial.clone(),
                    deploy_issues: member.deploy_issues,
                    recording_interval: member.recording_interval.clone(),
                    uptime_hourly: member.uptime_hourly.percent,
                    uptime_daily: member.uptime_daily.percent,
                },
            );
        }

        let mut params = BTreeMap::new();
        for spec in &self.params {
            let mut summary = ParamSummary {
                class: spec.class,
                ..ParamSummary::default()
            };
            for interval in [Interval::Hour, Interval::Day] {
                let averaged = match interval {
                    Interval::Hour => hourly,
                    Interval::Day => daily,
                };
                let reference = references
                    .iter()
                    .find(|(class, _)| *class == spec.class)
                    .and_then(|(_, tables)| match interval {
                        Interval::Hour => tables.hourly.as_ref(),
                        Interval::Day => tables.daily.as_ref(),
                    });
                let stats = self.evaluate_param(
                    group, spec, interval, averaged, reference, metrics,
                )?;
                match interval {
                    Interval::Hour => {
                        summary.reference.hourly = Some(stats.reference);
                        summary.precision.hourly = Some(stats.precision);
                        summary.error.hourly = Some(stats.error);
                    }
                    Interval::Day => {
                        summary.reference.daily = Some(stats.reference);
                        summary.precision.daily = Some(stats.precision);
                        summary.error.daily = Some(stats.error);
                    }
                }
                if summary.reference_name.is_empty() {
                    summary.reference_name = stats.reference_name;
                    summary.reference_site = stats.reference_site;
                }
            }
            params.insert(spec.name.clone(), summary);
        }

        let met_conditions = self.met_conditions(group, references);

        Ok(GroupSummary {
            eval_start: iso(group.start),
            eval_end: iso(group.end),
            eval_duration: humanize_duration(group.duration),
            sensors,
            params,
            met_conditions,
        })
    }

    /// One (param, interval) evaluation for one group: regression rows into
    /// `metrics`, pooled error/precision and reference stats returned.
    fn evaluate_param(
        &self,
        group: &DeploymentGroup,
        spec: &ParamSpec,
        interval: Interval,
        averaged: &[TimeSeries],
        reference: Option<&TimeSeries>,
        metrics: &mut Vec<MetricRecord>,
    ) -> Result<ParamIntervalStats> {
        let member_series: Vec<&TimeSeries> = group
            .member_devices()
            .map(|d| &averaged[d])
            .collect();
        let flagged: Vec<bool> = group.members.iter().map(|m| m.deploy_issues).collect();

        // Common axis across members and reference, clipped to the group's
        // canonical window so only truly-concurrent data enter statistics.
        let mut axis_inputs = member_series.clone();
        if let Some(r) = reference {
            axis_inputs.push(r);
        }
        let lo = interval.floor(group.start);
        let hi = interval.floor(group.end);
        let axis: Vec<DateTime<Utc>> = synoptic_index(&axis_inputs)?
            .into_iter()
            .filter(|ts| *ts >= lo && *ts <= hi)
            .collect();

        let member_cols: Vec<Vec<Option<f64>>> = member_series
            .iter()
            .map(|s| {
                s.reindex(&axis)
                    .map(|r| r.numeric_or_missing(&spec.name).into_owned())
            })
            .collect::<Result<_>>()?;

        let (reference_col, reference_name, reference_site) = match reference {
            Some(r) => {
                let aligned = r.reindex(&axis)?;
                let name = r
                    .first_text(METHOD_COLUMN)
                    .unwrap_or("Reference")
                    .to_string();
                let site = r.first_text(SITE_COLUMN).map(str::to_string);
                (
                    aligned.numeric_or_missing(&spec.name).into_owned(),
                    name,
                    site,
                )
            }
            None => {
                tracing::debug!(param = spec.name, "no monitor, using cross-sensor mean");
                let mean = cross_sensor_mean(&member_series, &flagged, &spec.name, &axis)?;
                (
                    mean.numeric_or_missing(&spec.name).into_owned(),
                    INTERSENSOR_REFERENCE.to_string(),
                    None,
                )
            }
        };

        // Per-device regression rows, then the synthetic average row.
        let batch_start = metrics.len();
        for (member, device_col) in group.members.iter().zip(&member_cols) {
            let device = &self.devices[member.device];
            metrics.push(MetricRecord {
                sensor_name: self.sensor_name.clone(),
                sensor_number: device.number.parse().ok(),
                sensor_serial: Some(device.serial.clone()),
                averaging_interval: interval.label().to_string(),
                param: spec.name.clone(),
                reference: reference_name.clone(),
                stats: regress(
                    device_col,
                    &reference_col,
                    self.config.regression.min_pairs,
                ),
            });
        }
        if let Some(avg) = metric_average_row(&metrics[batch_start..]) {
            metrics.push(avg);
        }

        let member_slices: Vec<&[Option<f64>]> =
            member_cols.iter().map(Vec::as_slice).collect();
        let error = group_error(&member_slices, &reference_col);

        let healthy_cols: Vec<&[Option<f64>]> = member_slices
            .iter()
            .zip(&flagged)
            .filter(|(_, f)| !**f)
            .map(|(s, _)| *s)
            .collect();
        let precision = group_precision(&healthy_cols);

        Ok(ParamIntervalStats {
            reference: ref_stats(&reference_col),
            precision: PrecisionStats {
                sd: precision.sd,
                cv_pct: precision.cv_pct,
                n_total: precision.n_total,
            },
            error: ErrorStats {
                rmse: error.rmse,
                nrmse_pct: error.nrmse_pct,
                n: error.n,
                m: error.m,
            },
            reference_name,
            reference_site,
        })
    }

    /// Exceedance counts over the group window from the meteorological
    /// reference, when one exists.
    fn met_conditions(
        &self,
        group: &DeploymentGroup,
        references: &[(ParamClass, ByInterval<TimeSeries>)],
    ) -> ByInterval<MetCounts> {
        let met = references.iter().find(|(class, _)| *class == ParamClass::Met);
        let Some((_, tables)) = met else {
            return ByInterval::default();
        };
        let count = |table: Option<&TimeSeries>, interval: Interval| -> Option<MetCounts> {
            let table = table?;
            let lo = interval.floor(group.start);
            let hi = interval.floor(group.end);
            let targets = self.config.met_targets;
            let temp = table.numeric_or_missing(TEMP_COLUMN);
            let rh = table.numeric_or_missing(RH_COLUMN);
            let mut counts = MetCounts::default();
            for (i, ts) in table.timestamps().iter().enumerate() {
                if *ts < lo || *ts > hi {
                    continue;
                }
                let t = temp[i];
                let h = rh[i];
                if t.is_some() || h.is_some() {
                    counts.n_intervals += 1;
                }
                if t.is_some_and(|t| t < targets.temp_min_c || t > targets.temp_max_c) {
                    counts.temp_exceedances += 1;
                }
                if h.is_some_and(|h| h < targets.rh_min_pct || h > targets.rh_max_pct) {
                    counts.rh_exceedances += 1;
                }
            }
            Some(counts)
        };
        ByInterval {
            hourly: count(tables.hourly.as_ref(), Interval::Hour),
            daily: count(tables.daily.as_ref(), Interval::Day),
        }
    }
}

struct ParamIntervalStats {
    reference: RefStats,
    precision: PrecisionStats,
    error: ErrorStats,
    reference_name: String,
    reference_site: Option<String>,
}

fn ref_stats(reference: &[Option<f64>]) -> RefStats {
    let values: Vec<f64> = reference.iter().flatten().copied().collect();
    if values.is_empty() {
        return RefStats::default();
    }
    let n = values.len();
    RefStats {
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
        mean: Some(values.iter().sum::<f64>() / n as f64),
        n,
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}
