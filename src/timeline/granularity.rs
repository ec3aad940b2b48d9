use crate::model::{Granularity, TimeWindow, MILLIS_PER_DAY};
use chrono::{DateTime, Utc};

pub const GROUP_BY_HOUR: &str = "P1H";
pub const GROUP_BY_DAY: &str = "P1D";
pub const GROUP_BY_WEEK: &str = "P1W";
pub const GROUP_BY_MONTH: &str = "P1M";

/// Picks a bucket size from the window length when the caller gave none.
pub fn infer_unit(window: &TimeWindow) -> Granularity {
    let days = window.duration_days();
    if days < 1.0 {
        Granularity::Hour
    } else if days < 60.0 {
        // Windows up to a week and up to two months both bucket by day.
        Granularity::Day
    } else {
        Granularity::Month
    }
}

/// ISO-8601 grouping period for a historical time-series query.
///
/// Uses whole days rounded up, so a window of 1 day and 1 second groups
/// daily rather than hourly.
pub fn select_group_by(from: DateTime<Utc>, to: DateTime<Utc>) -> &'static str {
    let days = ((to - from).num_milliseconds() as f64 / MILLIS_PER_DAY).ceil() as i64;
    if days <= 1 {
        GROUP_BY_HOUR
    } else if days <= 31 {
        GROUP_BY_DAY
    } else if days <= 91 {
        GROUP_BY_WEEK
    } else {
        GROUP_BY_MONTH
    }
}
