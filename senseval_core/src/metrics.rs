//! The row-oriented metric table consumed by report/plot collaborators.
//!
//! The column layout is a fixed, explicitly ordered schema — consumers
//! address cells by these names, never by position.

use std::io::Write;

use crate::error::Result;
use crate::stats::RegressionStats;

/// Header row of the metric table, in serialization order.
pub const COLUMNS: [&str; 14] = [
    "Sensor Name",
    "Sensor_Number",
    "Sensor_Serial",
    "Averaging Interval",
    "Param",
    "Reference",
    "R²",
    "Slope",
    "Intercept",
    "Sensor RMSE",
    "N",
    "Sensor_Min",
    "Sensor_Max",
    "Sensor_Mean",
];

/// Serial label used on the synthetic per-interval average row.
pub const METRIC_AVERAGE_LABEL: &str = "Metric Average";

/// One row of the metric table: one (device, averaging interval) pair, or
/// the synthetic per-interval average row (`sensor_number` empty,
/// `sensor_serial` = [`METRIC_AVERAGE_LABEL`]).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub sensor_name: String,
    pub sensor_number: Option<u32>,
    pub sensor_serial: Option<String>,
    pub averaging_interval: String,
    pub param: String,
    pub reference: String,
    pub stats: RegressionStats,
}

impl MetricRecord {
    fn cells(&self) -> [String; 14] {
        [
            self.sensor_name.clone(),
            self.sensor_number.map(|n| n.to_string()).unwrap_or_default(),
            self.sensor_serial.clone().unwrap_or_default(),
            self.averaging_interval.clone(),
            self.param.clone(),
            self.reference.clone(),
            fmt_cell(self.stats.r_squared),
            fmt_cell(self.stats.slope),
            fmt_cell(self.stats.intercept),
            fmt_cell(self.stats.rmse),
            self.stats.n.map(|n| n.to_string()).unwrap_or_default(),
            fmt_cell(self.stats.min),
            fmt_cell(self.stats.max),
            fmt_cell(self.stats.mean),
        ]
    }
}

/// Missing values render as blank cells so consumers never mistake "not
/// computable" for zero.
fn fmt_cell(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Append the synthetic average row for a batch of per-device rows sharing
/// one (param, interval, reference). Each numeric column is averaged over
/// the rows where it is non-missing; a column with no computable per-device
/// value stays missing in the average row too.
pub fn metric_average_row(rows: &[MetricRecord]) -> Option<MetricRecord> {
    let first = rows.first()?;
    let avg = |pick: fn(&RegressionStats) -> Option<f64>| -> Option<f64> {
        let values: Vec<f64> = rows.iter().filter_map(|r| pick(&r.stats)).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };
    let ns: Vec<usize> = rows.iter().filter_map(|r| r.stats.n).collect();
    let n = if ns.is_empty() {
        None
    } else {
        Some((ns.iter().sum::<usize>() as f64 / ns.len() as f64).round() as usize)
    };
    Some(MetricRecord {
        sensor_name: first.sensor_name.clone(),
        sensor_number: None,
        sensor_serial: Some(METRIC_AVERAGE_LABEL.to_string()),
        averaging_interval: first.averaging_interval.clone(),
        param: first.param.clone(),
        reference: first.reference.clone(),
        stats: RegressionStats {
            r_squared: avg(|s| s.r_squared),
            slope: avg(|s| s.slope),
            intercept: avg(|s| s.intercept),
            rmse: avg(|s| s.rmse),
            n,
            min: avg(|s| s.min),
            max: avg(|s| s.max),
            mean: avg(|s| s.mean),
        },
    })
}

/// Write the metric table as delimited text with the fixed header.
pub fn write_csv<W: Write>(rows: &[MetricRecord], writer: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(COLUMNS)?;
    for row in rows {
        w.write_record(row.cells())?;
    }
    w.flush()?;
    Ok(())
}
