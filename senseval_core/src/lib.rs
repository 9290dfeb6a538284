#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Deployment & statistics engine for collocated sensor evaluation.
//!
//! Given per-device raw time series and reference-monitor tables, this crate
//! decides which devices were tested concurrently (deployment groups),
//! derives completeness-qualified hourly/daily averages, aligns everything
//! on a common timestamp axis, and computes the regression, error,
//! precision, and uptime statistics that reporting consumes.
//!
//! ## Architecture
//!
//! - **Series**: time-indexed tables with explicit missing markers
//!   (`series` module)
//! - **Averaging**: irregular samples → completeness-gated fixed cadence
//!   (`average` module)
//! - **Deployment**: period extraction and fuzzy start-time grouping
//!   (`deployment` module)
//! - **Alignment**: the synoptic index every cross-series computation
//!   pairs on (`synoptic` module)
//! - **Statistics**: OLS regression, pooled RMSE/nRMSE, cross-sensor CV/SD,
//!   uptime (`stats`, `uptime`, `intersensor` modules)
//! - **Outputs**: the typed deployment summary and the fixed-schema metric
//!   table (`summary`, `metrics` modules), assembled by `session`
//!
//! Insufficient data never aborts a run: statistics that cannot be computed
//! carry the missing marker and processing continues. Hard errors are
//! reserved for caller-side precondition violations ([`error::EvalError`]).

pub mod average;
pub mod deployment;
pub mod error;
pub mod intersensor;
pub mod metrics;
pub mod series;
pub mod session;
pub mod stats;
pub mod summary;
pub mod synoptic;
pub mod uptime;
pub mod util;

pub use average::{interval_average, Interval};
pub use deployment::{extract_period, group_deployments, DeploymentGroup, DeploymentPeriod};
pub use error::{EvalError, Result};
pub use intersensor::cross_sensor_mean;
pub use metrics::{write_csv, MetricRecord};
pub use series::{Column, TimeSeries};
pub use session::{DeviceInput, EvalOutput, EvalSession, ParamSpec, ReferenceInput};
pub use stats::{group_error, group_precision, regress};
pub use summary::{DeploymentSummary, ParamClass};
pub use synoptic::synoptic_index;
pub use uptime::{uptime, Uptime};
