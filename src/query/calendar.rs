use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};

/// Remaps a window before it is sent to the historical store.
pub trait CalendarMapper: Send + Sync {
    fn map(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>);
}

/// Leaves real calendars untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCalendarMapper;

impl CalendarMapper for IdentityCalendarMapper {
    fn map(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (from, to)
    }
}

/// Moves windows into the months the demo historical store is seeded with.
///
/// Months are 0-based here (3 is April). `from` is moved to
/// `reference_month`, `to` to `reference_month + (to.month0 - from.month0)`
/// capped at `max_month`, each within its own year. A negative month index
/// rolls back into the previous year and a day past the end of the target
/// month rolls forward, so "April 31" becomes May 1. Time of day is kept.
#[derive(Debug, Clone, Copy)]
pub struct DemoCalendarMapper {
    pub reference_month: i32,
    pub max_month: i32,
}

impl Default for DemoCalendarMapper {
    fn default() -> Self {
        Self {
            reference_month: 3,
            max_month: 10,
        }
    }
}

impl CalendarMapper for DemoCalendarMapper {
    fn map(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let span = to.month0() as i32 - from.month0() as i32;
        let target = (self.reference_month + span).min(self.max_month);
        (
            set_month0(from, self.reference_month),
            set_month0(to, target),
        )
    }
}

fn set_month0(instant: DateTime<Utc>, month0: i32) -> DateTime<Utc> {
    let year = instant.year() + month0.div_euclid(12);
    let month = month0.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_days(Days::new(u64::from(instant.day0()))))
        .map(|date| Utc.from_utc_datetime(&date.and_time(instant.time())))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_demo_mapper_preserves_month_span() {
        let (from, to) = DemoCalendarMapper::default().map(at(2024, 1, 15), at(2024, 3, 15));
        assert_eq!(from.month0(), 3);
        assert_eq!(to.month0(), 5);
        assert_eq!(from, at(2024, 4, 15));
        assert_eq!(to, at(2024, 6, 15));
    }

    #[test]
    fn test_demo_mapper_clamps_long_spans() {
        let (from, to) = DemoCalendarMapper::default().map(at(2024, 1, 10), at(2024, 12, 20));
        assert_eq!(from, at(2024, 4, 10));
        assert_eq!(to, at(2024, 11, 20));
    }

    #[test]
    fn test_demo_mapper_same_month() {
        let (from, to) = DemoCalendarMapper::default().map(at(2024, 1, 1), at(2024, 1, 3));
        assert_eq!(from, at(2024, 4, 1));
        assert_eq!(to, at(2024, 4, 3));
    }

    #[test]
    fn test_demo_mapper_rolls_day_overflow_forward() {
        let (from, _) = DemoCalendarMapper::default().map(at(2024, 1, 31), at(2024, 1, 31));
        assert_eq!(from, at(2024, 5, 1));
    }

    #[test]
    fn test_demo_mapper_across_year_boundary() {
        let (from, to) = DemoCalendarMapper::default().map(at(2023, 12, 1), at(2024, 2, 1));
        assert_eq!(from, at(2023, 4, 1));
        assert_eq!(to, at(2023, 6, 1));
    }

    #[test]
    fn test_identity_mapper() {
        let (from, to) = IdentityCalendarMapper.map(at(2024, 1, 15), at(2024, 3, 15));
        assert_eq!(from, at(2024, 1, 15));
        assert_eq!(to, at(2024, 3, 15));
    }
}
