//! Timezone resolution and the calendar arithmetic used by windowed
//! aggregation and navigation.
//!
//! Everything that depends on calendar months or local midnights lives here so
//! the aggregator only deals in instants and bucket indices.

use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{Result, StatsError};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// The display timezone in which buckets, labels and calendar units are
/// computed.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// `"auto"` resolves to the system timezone. Unrecognised names fall back
    /// to UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let name = if tz_name == "auto" {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                name
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Strict variant of [`TimezoneHandler::new`].
    pub fn try_new(tz_name: &str) -> Result<Self> {
        tz_name
            .parse::<Tz>()
            .map(|tz| Self { tz })
            .map_err(|_| StatsError::InvalidTimezone(tz_name.to_string()))
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// View a UTC instant in the display timezone.
    pub fn local(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.tz)
    }

    /// Parse a `YYYY-MM-DD` anchor date.
    ///
    /// The anchor is the first instant of the *following* local day so that a
    /// window ending at it covers the whole named day.
    pub fn parse_end_date(&self, s: &str) -> Result<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| StatsError::InvalidDate(s.to_string()))?;
        let next = date
            .succ_opt()
            .ok_or_else(|| StatsError::InvalidDate(s.to_string()))?;
        Ok(start_of_day(self.tz, next))
    }
}

// ── Calendar arithmetic ───────────────────────────────────────────────────────

/// Absolute month number (`year * 12 + month0`) of `dt` in `tz`.
pub fn month_index(dt: DateTime<Utc>, tz: Tz) -> i32 {
    let local = dt.with_timezone(&tz);
    local.year() * 12 + local.month0() as i32
}

/// Calendar months from `start` to `dt`, both read in `tz`.
pub fn month_diff(start: DateTime<Utc>, dt: DateTime<Utc>, tz: Tz) -> i32 {
    month_index(dt, tz) - month_index(start, tz)
}

/// Inverse of [`month_index`]: first instant of that month in `tz`.
pub fn start_of_month_index(index: i32, tz: Tz) -> DateTime<Utc> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => start_of_day(tz, date),
        None if index < 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// `dt + delta`, saturating at the ends of chrono's representable range.
pub fn saturating_add(dt: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    dt.checked_add_signed(delta).unwrap_or(if delta < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// First instant of the month containing `dt`.
pub fn start_of_month(dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_month_index(month_index(dt, tz), tz)
}

/// Last millisecond of the month containing `dt`.
pub fn end_of_month(dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    saturating_add(
        start_of_month_index(month_index(dt, tz) + 1, tz),
        TimeDelta::milliseconds(-1),
    )
}

/// Last millisecond of the calendar year containing `dt`.
pub fn end_of_year(dt: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let year = dt.with_timezone(&tz).year();
    saturating_add(
        start_of_month_index((year + 1) * 12, tz),
        TimeDelta::milliseconds(-1),
    )
}

/// Local midnight at the start of `date`.
pub fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(chrono::NaiveTime::MIN))
}

/// Move `dt` by whole calendar months in `tz`, keeping the local time of day.
///
/// The day of month is clamped to the length of the target month
/// (31 Mar − 1 month = 29 Feb in a leap year). Results beyond chrono's range
/// saturate at the input.
pub fn shift_months(dt: DateTime<Utc>, months: i32, tz: Tz) -> DateTime<Utc> {
    let local = dt.with_timezone(&tz).naive_local();
    let magnitude = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        local.checked_add_months(magnitude)
    } else {
        local.checked_sub_months(magnitude)
    };
    match shifted {
        Some(naive) => resolve_local(tz, naive),
        None => dt,
    }
}

/// Map a local wall-clock time to UTC.
///
/// Ambiguous times take the earlier instant; times skipped by a DST jump
/// move forward one hour.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }
    let bumped = naive.checked_add_signed(TimeDelta::hours(1)).unwrap_or(naive);
    match tz.from_local_datetime(&bumped).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_validate_timezone() {
        assert!(TimezoneHandler::validate_timezone("Europe/Berlin"));
        assert!(TimezoneHandler::validate_timezone("UTC"));
        assert!(!TimezoneHandler::validate_timezone("Mars/Olympus"));
        assert!(!TimezoneHandler::validate_timezone(""));
    }

    #[test]
    fn test_new_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Invalid/Timezone");
        assert_eq!(handler.tz(), Tz::UTC);
    }

    #[test]
    fn test_try_new_rejects_invalid() {
        assert!(TimezoneHandler::try_new("Europe/Paris").is_ok());
        assert!(matches!(
            TimezoneHandler::try_new("Nowhere/City"),
            Err(StatsError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_get_system_timezone_returns_nonempty_string() {
        assert!(!get_system_timezone().is_empty());
    }

    #[test]
    fn test_parse_end_date_is_next_local_midnight() {
        let handler = TimezoneHandler::utc();
        let end = handler.parse_end_date("2024-03-10").unwrap();
        assert_eq!(end, utc(2024, 3, 11, 0));

        let berlin = TimezoneHandler::try_new("Europe/Berlin").unwrap();
        let end = berlin.parse_end_date("2024-01-15").unwrap();
        // 16 Jan 00:00 CET = 15 Jan 23:00 UTC.
        assert_eq!(end, utc(2024, 1, 15, 23));
    }

    #[test]
    fn test_parse_end_date_invalid() {
        let handler = TimezoneHandler::utc();
        assert!(matches!(
            handler.parse_end_date("15/01/2024"),
            Err(StatsError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_month_diff_across_years() {
        let tz = Tz::UTC;
        assert_eq!(month_diff(utc(2023, 11, 5, 0), utc(2024, 2, 1, 0), tz), 3);
        assert_eq!(month_diff(utc(2024, 2, 1, 0), utc(2024, 2, 29, 0), tz), 0);
        assert_eq!(month_diff(utc(2024, 2, 1, 0), utc(2023, 12, 31, 0), tz), -2);
    }

    #[test]
    fn test_month_index_uses_local_calendar() {
        // 31 Jan 23:30 UTC is already February in Tokyo.
        let dt = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        assert_eq!(month_index(dt, Tz::UTC) % 12, 0);
        assert_eq!(month_index(dt, Tz::Asia__Tokyo) % 12, 1);
    }

    #[test]
    fn test_start_and_end_of_month() {
        let tz = Tz::UTC;
        let dt = utc(2024, 2, 14, 12);
        assert_eq!(start_of_month(dt, tz), utc(2024, 2, 1, 0));
        let end = end_of_month(dt, tz);
        assert_eq!(end, utc(2024, 3, 1, 0) - TimeDelta::milliseconds(1));
        assert_eq!(end.day(), 29);
    }

    #[test]
    fn test_end_of_year() {
        let end = end_of_year(utc(2023, 6, 1, 0), Tz::UTC);
        assert_eq!(end, utc(2024, 1, 1, 0) - TimeDelta::milliseconds(1));
    }

    #[test]
    fn test_start_of_month_index_round_trip() {
        let tz = Tz::Europe__Berlin;
        let dt = utc(2024, 7, 20, 9);
        let start = start_of_month_index(month_index(dt, tz), tz);
        let local = start.with_timezone(&tz);
        assert_eq!((local.year(), local.month(), local.day()), (2024, 7, 1));
        assert_eq!(local.hour(), 0);
    }

    #[test]
    fn test_shift_months_clamps_day() {
        let tz = Tz::UTC;
        assert_eq!(shift_months(utc(2024, 3, 31, 10), -1, tz), utc(2024, 2, 29, 10));
        assert_eq!(shift_months(utc(2024, 1, 31, 10), 1, tz), utc(2024, 2, 29, 10));
        assert_eq!(shift_months(utc(2023, 1, 31, 10), 1, tz), utc(2023, 2, 28, 10));
    }

    #[test]
    fn test_shift_months_leap_year() {
        let tz = Tz::UTC;
        assert_eq!(shift_months(utc(2024, 2, 29, 0), 12, tz), utc(2025, 2, 28, 0));
        assert_eq!(shift_months(utc(2024, 2, 29, 0), -12, tz), utc(2023, 2, 28, 0));
    }

    #[test]
    fn test_start_of_day_in_dst_gap() {
        // America/Sao_Paulo skipped midnight on 4 Nov 2018.
        let tz = Tz::America__Sao_Paulo;
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let start = start_of_day(tz, date);
        let local = start.with_timezone(&tz);
        assert_eq!(local.day(), 4);
        assert_eq!(local.hour(), 1);
    }

    #[test]
    fn test_saturating_add_clamps_at_range_ends() {
        let min = DateTime::<Utc>::MIN_UTC;
        let max = DateTime::<Utc>::MAX_UTC;
        assert_eq!(saturating_add(min, TimeDelta::days(-30)), min);
        assert_eq!(saturating_add(max, TimeDelta::weeks(12)), max);
        assert_eq!(
            saturating_add(utc(2024, 1, 31, 0), TimeDelta::days(1)),
            utc(2024, 2, 1, 0)
        );
    }

    #[test]
    fn test_month_bounds_at_range_ends() {
        let max = DateTime::<Utc>::MAX_UTC;
        assert!(end_of_month(max, Tz::UTC) <= max);
        assert!(end_of_year(max, Tz::UTC) <= max);
        assert_eq!(start_of_month_index(i32::MAX / 2, Tz::UTC), max);
        assert_eq!(
            start_of_month_index(i32::MIN / 2, Tz::UTC),
            DateTime::<Utc>::MIN_UTC
        );
    }
}
