// ⏰ Temporal Utilities - Date-only eligibility math
//
// Membership expiry and payment dates arrive as loosely formatted strings.
// Everything here degrades to None/false instead of failing: an unparseable
// date simply means "unknown", and unknown never grants access.
//
// Two clocks matter:
// 1. Calendar day ("today"): drives expiry checks, time-of-day stripped
// 2. Wall clock ("now"): stamps entry records

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

/// Placeholder shown when a date cannot be displayed
pub const NOT_AVAILABLE: &str = "N/D";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now" and "today" for every decision.
///
/// Injected so that eligibility is a pure function of the records and the
/// calendar day, and so tests can pin the day.
pub trait Clock {
    /// Current instant, used for entry timestamps
    fn now(&self) -> DateTime<Utc>;

    /// Current local calendar day (midnight-normalized)
    fn today(&self) -> NaiveDate;
}

/// Wall clock of the machine running the kiosk
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, today: NaiveDate) -> Self {
        FixedClock { now, today }
    }

    /// Noon UTC on the given day
    pub fn on(today: NaiveDate) -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        FixedClock {
            now: today.and_time(noon).and_utc(),
            today,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse a date or timestamp string, keeping time-of-day.
///
/// Accepts RFC 3339 (`2025-01-15T10:30:00.000Z`), ISO-like local
/// timestamps, and plain dates (`2025-01-15`, `2025/01/15`, `01/15/2025`).
/// Plain dates land on midnight. Offsets are not converted: the calendar
/// date is the one written in the string.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// Parse a date and drop its time-of-day. Empty or malformed input → None.
pub fn parse_date_only(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date())
}

// ============================================================================
// ELIGIBILITY MATH
// ============================================================================

/// True iff `raw` parses and falls on or after `today`.
///
/// Expiry is inclusive: the expiry day itself still grants access.
pub fn is_membership_current(raw: &str, today: NaiveDate) -> bool {
    match parse_date_only(raw) {
        Some(expiry) => expiry >= today,
        None => false,
    }
}

/// Whole days from `today` to the date in `raw`. Negative for past dates.
pub fn days_until(raw: &str, today: NaiveDate) -> Option<i64> {
    parse_date_only(raw).map(|expiry| (expiry - today).num_days())
}

/// `DD/MM/YYYY`, or an empty string when `raw` doesn't parse
pub fn format_date_display(raw: &str) -> String {
    parse_date_only(raw)
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// Like [`format_date_display`] but falls back to [`NOT_AVAILABLE`]
pub fn format_date_or_na(raw: &str) -> String {
    let formatted = format_date_display(raw);
    if formatted.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        formatted
    }
}

/// ISO-8601 UTC timestamp with millisecond precision (`2025-01-15T10:30:00.000Z`)
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_only_formats() {
        assert_eq!(parse_date_only("2025-01-15"), Some(day(2025, 1, 15)));
        assert_eq!(parse_date_only("  2025-01-15  "), Some(day(2025, 1, 15)));
        assert_eq!(parse_date_only("2025/01/15"), Some(day(2025, 1, 15)));
        assert_eq!(parse_date_only("01/15/2025"), Some(day(2025, 1, 15)));
        assert_eq!(parse_date_only("2025-01-15T23:59:59"), Some(day(2025, 1, 15)));
        assert_eq!(parse_date_only("2025-01-15T10:30:00.000Z"), Some(day(2025, 1, 15)));
        assert_eq!(parse_date_only("2025-01-15T10:30:00-03:00"), Some(day(2025, 1, 15)));
    }

    #[test]
    fn test_parse_date_only_rejects_garbage() {
        assert_eq!(parse_date_only(""), None);
        assert_eq!(parse_date_only("   "), None);
        assert_eq!(parse_date_only("not-a-date"), None);
        assert_eq!(parse_date_only("2025-13-40"), None);
    }

    #[test]
    fn test_parse_timestamp_keeps_time_of_day() {
        let dt = parse_timestamp("2025-01-15 08:45:00").unwrap();
        assert_eq!(dt.date(), day(2025, 1, 15));
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(8, 45, 0).unwrap());

        let midnight = parse_timestamp("2025-01-15").unwrap();
        assert_eq!(midnight.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_membership_current_is_inclusive() {
        let today = day(2025, 6, 10);

        assert!(is_membership_current("2025-06-10", today));
        assert!(is_membership_current("2025-06-11", today));
        assert!(is_membership_current("2025-06-10T00:00:01", today));
        assert!(!is_membership_current("2025-06-09", today));
        assert!(!is_membership_current("", today));
        assert!(!is_membership_current("someday", today));
    }

    #[test]
    fn test_days_until() {
        let today = day(2025, 6, 10);

        assert_eq!(days_until("2025-06-11", today), Some(1));
        assert_eq!(days_until("2025-07-10", today), Some(30));
        assert_eq!(days_until("2025-06-10", today), Some(0));
        assert_eq!(days_until("2025-06-01", today), Some(-9));
        assert_eq!(days_until("", today), None);
    }

    #[test]
    fn test_format_date_display() {
        assert_eq!(format_date_display("2025-03-07"), "07/03/2025");
        assert_eq!(format_date_display("garbage"), "");
        assert_eq!(format_date_or_na(""), NOT_AVAILABLE);
        assert_eq!(format_date_or_na("2025-03-07"), "07/03/2025");
    }

    #[test]
    fn test_fixed_clock_and_iso_timestamp() {
        let clock = FixedClock::on(day(2025, 6, 10));
        assert_eq!(clock.today(), day(2025, 6, 10));
        assert_eq!(iso_timestamp(clock.now()), "2025-06-10T12:00:00.000Z");

        let instant = Utc.with_ymd_and_hms(2024, 12, 31, 23, 5, 9).unwrap();
        assert_eq!(iso_timestamp(instant), "2024-12-31T23:05:09.000Z");
    }
}
