use crate::model::{Granularity, TimeWindow};
use chrono::{DateTime, Duration, Months, TimeZone, Timelike, Utc};

/// Splits a window into the ordered bucket-start instants for `unit`.
///
/// `Hour` only walks the calendar day of `window.from()`, emitting hours
/// `0..to.hour()`; it never advances to the next day. The other units step
/// from `from` up to and including `to`, so a zero-length window still
/// yields its start boundary.
pub fn segment(window: &TimeWindow, unit: Granularity) -> Vec<DateTime<Utc>> {
    match unit {
        Granularity::Hour => hourly(window),
        Granularity::Day => fixed_step(window, Duration::days(1)),
        Granularity::Week => fixed_step(window, Duration::days(7)),
        Granularity::Month => monthly(window),
    }
}

fn hourly(window: &TimeWindow) -> Vec<DateTime<Utc>> {
    let day = window.from().date_naive();
    (0..window.to().hour())
        .filter_map(|hour| day.and_hms_opt(hour, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .collect()
}

fn fixed_step(window: &TimeWindow, step: Duration) -> Vec<DateTime<Utc>> {
    let mut buckets = Vec::new();
    let mut current = window.from();
    while current <= window.to() {
        buckets.push(current);
        current += step;
    }
    buckets
}

// Each boundary is computed from `from` directly so a start on the 31st does
// not drift to the 28th after passing through February.
fn monthly(window: &TimeWindow) -> Vec<DateTime<Utc>> {
    let mut buckets = Vec::new();
    let mut offset = 0u32;
    while let Some(current) = window.from().checked_add_months(Months::new(offset)) {
        if current > window.to() {
            break;
        }
        buckets.push(current);
        offset += 1;
    }
    buckets
}
