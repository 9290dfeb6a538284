//! Common time/duration helpers for senseval_core.

use chrono::Duration;

/// Number of seconds in one minute.
pub const SECS_PER_MINUTE: i64 = 60;
/// Number of seconds in one hour.
pub const SECS_PER_HOUR: i64 = 3_600;
/// Number of seconds in one day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Render a duration as a composite human-readable string, e.g.
/// "5 minutes", "1 hour 30 minutes", "13 days 6 hours".
///
/// All non-zero units are listed in descending order; a non-positive
/// duration renders as "0 seconds".
pub fn humanize_duration(d: Duration) -> String {
    let mut secs = d.num_seconds().max(0);
    let days = secs / SECS_PER_DAY;
    secs %= SECS_PER_DAY;
    let hours = secs / SECS_PER_HOUR;
    secs %= SECS_PER_HOUR;
    let minutes = secs / SECS_PER_MINUTE;
    secs %= SECS_PER_MINUTE;

    let mut parts = Vec::new();
    for (value, unit) in [
        (days, "day"),
        (hours, "hour"),
        (minutes, "minute"),
        (secs, "second"),
    ] {
        if value > 0 {
            let plural = if value == 1 { "" } else { "s" };
            parts.push(format!("{value} {unit}{plural}"));
        }
    }
    if parts.is_empty() {
        return "0 seconds".to_string();
    }
    parts.join(" ")
}

/// Round to three decimal places (uptime percentages).
#[inline]
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
