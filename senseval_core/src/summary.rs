//! The typed deployment summary handed to report/plot consumers.
//!
//! Internals use real types throughout; legacy wire compatibility lives
//! only at the serialization boundary (booleans render as the literal
//! strings `"True"`/`"False"` because downstream consumers compare them by
//! string equality).

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::error::Result;

/// Parameter classification; decides which reference table a parameter is
/// compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ParamClass {
    #[default]
    Particulate,
    Gas,
    Met,
}

/// One value per averaging interval. Fields are typed slots, not
/// string-suffixed keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ByInterval<T> {
    #[serde(rename = "Hourly")]
    pub hourly: Option<T>,
    #[serde(rename = "Daily")]
    pub daily: Option<T>,
}

/// Reference-value statistics over a group window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Evaluable (non-missing) interval count.
    pub n: usize,
}

/// Cross-sensor precision over a group window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PrecisionStats {
    pub sd: Option<f64>,
    pub cv_pct: Option<f64>,
    pub n_total: usize,
}

/// Pooled error over a group window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    pub rmse: Option<f64>,
    pub nrmse_pct: Option<f64>,
    pub n: usize,
    pub m: usize,
}

/// Per-parameter block of a group summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamSummary {
    pub class: ParamClass,
    /// Reference identity: method name and site, carried through from the
    /// reference table's metadata columns when present.
    pub reference_name: String,
    pub reference_site: Option<String>,
    #[serde(rename = "Reference")]
    pub reference: ByInterval<RefStats>,
    #[serde(rename = "Precision")]
    pub precision: ByInterval<PrecisionStats>,
    #[serde(rename = "Error")]
    pub error: ByInterval<ErrorStats>,
}

/// Meteorological exceedance counts for one averaging interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetCounts {
    /// Intervals with an evaluable temperature or humidity value.
    pub n_intervals: usize,
    pub temp_exceedances: usize,
    pub rh_exceedances: usize,
}

/// One device's entry in a group summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntry {
    pub serial_id: String,
    #[serde(serialize_with = "bool_as_title_string")]
    pub deploy_issues: bool,
    pub recording_interval: String,
    pub uptime_hourly: f64,
    pub uptime_daily: f64,
}

/// One deployment group's slice of the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    /// ISO timestamps of the canonical (intersection) window.
    pub eval_start: String,
    pub eval_end: String,
    pub eval_duration: String,
    /// Keyed by device-number string, in the session's device ordering.
    pub sensors: BTreeMap<String, SensorEntry>,
    /// Keyed by parameter name.
    #[serde(flatten)]
    pub params: BTreeMap<String, ParamSummary>,
    #[serde(rename = "Meteorological Conditions")]
    pub met_conditions: ByInterval<MetCounts>,
}

/// The top-level aggregate consumed by reporting collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentSummary {
    #[serde(rename = "Sensor Name")]
    pub sensor_name: String,
    #[serde(rename = "Deployment Groups")]
    pub groups: BTreeMap<String, GroupSummary>,
}

impl DeploymentSummary {
    /// Render the summary in its wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Legacy wire shim: `true` -> `"True"`, `false` -> `"False"`.
fn bool_as_title_string<S: Serializer>(v: &bool, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(if *v { "True" } else { "False" })
}
