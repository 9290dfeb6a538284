#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the deployment & statistics engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Defaults equal the legacy evaluation constants (1-day group start
//!   tolerance, 0.75 completeness threshold, 3 minimum regression pairs),
//!   so an empty TOML document is a valid, faithful configuration.
use serde::Deserialize;

/// Deployment-group formation parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Grouping {
    /// Two devices land in the same deployment group when their observed
    /// start timestamps differ by at most this many hours.
    pub start_tolerance_hours: u32,
}

impl Default for Grouping {
    fn default() -> Self {
        Self {
            start_tolerance_hours: 24,
        }
    }
}

/// Interval-averaging parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Averaging {
    /// Minimum fraction of expected raw samples a bucket needs for its
    /// average to be kept. Range: (0.0, 1.0].
    pub completeness_threshold: f64,
}

impl Default for Averaging {
    fn default() -> Self {
        Self {
            completeness_threshold: 0.75,
        }
    }
}

/// Regression parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Regression {
    /// Minimum paired sample count below which no fit is attempted and all
    /// regression outputs stay missing.
    pub min_pairs: usize,
}

impl Default for Regression {
    fn default() -> Self {
        Self { min_pairs: 3 }
    }
}

/// Meteorological target ranges used for exceedance counting.
///
/// An averaged interval is counted as an exceedance when temperature or
/// relative humidity falls outside the closed target range.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MetTargets {
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub rh_min_pct: f64,
    pub rh_max_pct: f64,
}

impl Default for MetTargets {
    fn default() -> Self {
        Self {
            temp_min_c: -20.0,
            temp_max_c: 40.0,
            rh_min_pct: 10.0,
            rh_max_pct: 90.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct Config {
    pub grouping: Grouping,
    pub averaging: Averaging,
    pub regression: Regression,
    pub met_targets: MetTargets,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Grouping
        if self.grouping.start_tolerance_hours == 0 {
            eyre::bail!("grouping.start_tolerance_hours must be >= 1");
        }
        if self.grouping.start_tolerance_hours > 7 * 24 {
            eyre::bail!("grouping.start_tolerance_hours is unreasonably large (>7 days)");
        }

        // Averaging
        if !(self.averaging.completeness_threshold > 0.0
            && self.averaging.completeness_threshold <= 1.0)
        {
            eyre::bail!("averaging.completeness_threshold must be in (0.0, 1.0]");
        }

        // Regression
        if self.regression.min_pairs < 2 {
            eyre::bail!("regression.min_pairs must be >= 2");
        }

        // Met targets
        if self.met_targets.temp_min_c >= self.met_targets.temp_max_c {
            eyre::bail!("met_targets.temp_min_c must be < met_targets.temp_max_c");
        }
        if self.met_targets.rh_min_pct >= self.met_targets.rh_max_pct {
            eyre::bail!("met_targets.rh_min_pct must be < met_targets.rh_max_pct");
        }
        if self.met_targets.rh_min_pct < 0.0 || self.met_targets.rh_max_pct > 100.0 {
            eyre::bail!("met_targets relative humidity range must stay within [0, 100]");
        }

        Ok(())
    }
}
