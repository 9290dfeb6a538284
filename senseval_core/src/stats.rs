//! Regression, error, and precision statistics over paired sensor and
//! reference series.
//!
//! Every function here degrades to the missing marker instead of failing
//! when data are insufficient: evaluation sessions routinely have partial
//! coverage, and a hard error would abort an otherwise valid multi-group
//! report.

/// Regression outputs for one (device, averaging interval) pair. All fields
/// are missing when fewer than the minimum paired points remain after
/// dropping one-sided rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegressionStats {
    /// Square of the Pearson correlation coefficient. Deliberately not the
    /// OLS-fit R², so the metric stays well-defined when dependent and
    /// independent roles are ambiguous.
    pub r_squared: Option<f64>,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    /// Root mean squared error between raw device and reference values
    /// (not the fitted line).
    pub rmse: Option<f64>,
    /// Paired-sample count.
    pub n: Option<usize>,
    /// Device-side extrema/mean over the paired rows only.
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// Least-squares fit of device (dependent) against reference (independent),
/// plus paired RMSE and device-side summary stats.
///
/// Pairs are formed positionally (the caller aligns both operands on the
/// synoptic index first); any row missing on either side is dropped.
pub fn regress(
    device: &[Option<f64>],
    reference: &[Option<f64>],
    min_pairs: usize,
) -> RegressionStats {
    let pairs: Vec<(f64, f64)> = device
        .iter()
        .zip(reference)
        .filter_map(|(d, r)| Some(((*d)?, (*r)?)))
        .collect();
    if pairs.len() < min_pairs.max(2) {
        tracing::debug!(pairs = pairs.len(), min_pairs, "too few pairs, skipping fit");
        return RegressionStats::default();
    }

    let n = pairs.len() as f64;
    let mean_x: f64 = pairs.iter().map(|(_, x)| x).sum::<f64>() / n;
    let mean_y: f64 = pairs.iter().map(|(y, _)| y).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut syy = 0.0f64;
    let mut sxy = 0.0f64;
    let mut sumsq_diff = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (y, x) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
        sumsq_diff += (y - x) * (y - x);
        min = min.min(*y);
        max = max.max(*y);
    }

    let (slope, intercept) = if sxx > 0.0 && sxx.is_finite() {
        let a = sxy / sxx;
        (Some(a), Some(mean_y - a * mean_x))
    } else {
        (None, None)
    };
    let r_squared = if sxx > 0.0 && syy > 0.0 {
        let r = sxy / (sxx.sqrt() * syy.sqrt());
        Some(r * r)
    } else {
        None
    };

    RegressionStats {
        r_squared,
        slope,
        intercept,
        rmse: Some((sumsq_diff / n).sqrt()),
        n: Some(pairs.len()),
        min: Some(min),
        max: Some(max),
        mean: Some(mean_y),
    }
}

/// Pooled error of a deployment group against its reference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupError {
    pub rmse: Option<f64>,
    /// 100 × RMSE / mean(reference); missing when the reference window is
    /// empty or its mean is zero.
    pub nrmse_pct: Option<f64>,
    /// Fully-concurrent timestamp count.
    pub n: usize,
    /// Device count.
    pub m: usize,
}

/// RMSE/nRMSE pooled over every member of a group.
///
/// A timestamp contributes only when the reference and every member have a
/// value there (strict AND across the whole group), so the error reflects
/// only fully-concurrent data:
/// `RMSE = sqrt( (1/(N·M)) · Σ_devices Σ_time (device − reference)² )`.
pub fn group_error(members: &[&[Option<f64>]], reference: &[Option<f64>]) -> GroupError {
    let m = members.len();
    if m == 0 {
        return GroupError::default();
    }
    let concurrent: Vec<usize> = (0..reference.len())
        .filter(|&row| {
            reference[row].is_some() && members.iter().all(|dev| dev[row].is_some())
        })
        .collect();
    let n = concurrent.len();
    if n == 0 {
        tracing::debug!("no fully-concurrent rows, error stats stay missing");
        return GroupError { m, ..GroupError::default() };
    }

    let mut sumsq = 0.0f64;
    let mut ref_sum = 0.0f64;
    for &row in &concurrent {
        // Presence checked above; missing cells cannot reach this point.
        let r = reference[row].unwrap_or_default();
        ref_sum += r;
        for dev in members {
            let d = dev[row].unwrap_or_default();
            sumsq += (d - r) * (d - r);
        }
    }
    let rmse = (sumsq / (n as f64 * m as f64)).sqrt();
    let ref_mean = ref_sum / n as f64;
    let nrmse_pct = if ref_mean != 0.0 {
        Some(100.0 * rmse / ref_mean)
    } else {
        None
    };
    GroupError {
        rmse: Some(rmse),
        nrmse_pct,
        n,
        m,
    }
}

/// Cross-device precision of a deployment group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupPrecision {
    pub sd: Option<f64>,
    /// 100 × SD / mean of the pooled values; missing when that mean is zero.
    pub cv_pct: Option<f64>,
    /// Device-row pairs actually summed, reported for auditability.
    pub n_total: usize,
}

/// Standard deviation / coefficient of variation across the pooled members.
///
/// Callers pass only the non-excluded members (devices flagged with
/// deployment issues are dropped from this computation specifically,
/// because precision is about agreement between healthy collocated units).
/// Rows with any missing member value are dropped; each remaining row
/// contributes its members' squared deviations from the row mean, and
/// `SD = sqrt(Σ / (N_total − 1))`.
pub fn group_precision(members: &[&[Option<f64>]]) -> GroupPrecision {
    let m = members.len();
    if m == 0 {
        return GroupPrecision::default();
    }
    let len = members[0].len();
    let mut sumsq = 0.0f64;
    let mut pooled_sum = 0.0f64;
    let mut n_total = 0usize;
    for row in 0..len {
        let values: Vec<f64> = members.iter().filter_map(|dev| dev[row]).collect();
        if values.len() != m {
            continue;
        }
        let row_mean = values.iter().sum::<f64>() / m as f64;
        for v in &values {
            sumsq += (v - row_mean) * (v - row_mean);
            pooled_sum += v;
        }
        n_total += m;
    }
    if n_total < 2 {
        return GroupPrecision { n_total, ..GroupPrecision::default() };
    }
    let sd = (sumsq / (n_total as f64 - 1.0)).sqrt();
    let pooled_mean = pooled_sum / n_total as f64;
    let cv_pct = if pooled_mean != 0.0 {
        Some(100.0 * sd / pooled_mean)
    } else {
        None
    };
    GroupPrecision {
        sd: Some(sd),
        cv_pct,
        n_total,
    }
}
