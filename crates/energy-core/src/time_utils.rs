use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::error::{EnergyError, Result};

/// Point in time as written in the source file.
///
/// Readings keep the wall-clock reference of their file; no timezone
/// conversion is ever applied, so day and hour boundaries are the file's own.
pub type Timestamp = NaiveDateTime;

const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_WEEK: i64 = 7 * SECS_PER_DAY;

/// 1970-01-01 was a Thursday; the first Monday is four days later.
const MONDAY_ANCHOR_SECS: i64 = 4 * SECS_PER_DAY;

// ── Timestamp parsing ─────────────────────────────────────────────────────────

/// Date-time patterns tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only patterns; the reading is placed at midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a free-form timestamp string.
///
/// RFC 3339 input keeps its local wall-clock time and drops the offset.
/// Returns `None` for empty or unrecognised strings.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim().trim_start_matches('\u{feff}');
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    None
}

// ── BucketWindow ──────────────────────────────────────────────────────────────

/// Fixed-width calendar window used to group readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketWindow {
    /// Clock hour, `HH:00` to `HH+1:00`.
    Hour,
    /// Calendar day, midnight to midnight.
    Day,
    /// Calendar week, Monday 00:00 to the following Monday 00:00.
    Week,
    /// Arbitrary width aligned to 1970-01-01 00:00.
    Fixed(TimeDelta),
}

impl BucketWindow {
    /// Reject windows that cannot partition time.
    pub fn validate(&self) -> Result<()> {
        if let Self::Fixed(width) = self {
            if *width <= TimeDelta::zero() {
                return Err(EnergyError::InvalidBucketWindow(format!(
                    "width must be positive, got {}s",
                    width.num_seconds()
                )));
            }
            if width.subsec_nanos() != 0 {
                return Err(EnergyError::InvalidBucketWindow(
                    "width must be a whole number of seconds".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn width(&self) -> TimeDelta {
        match self {
            Self::Hour => TimeDelta::hours(1),
            Self::Day => TimeDelta::days(1),
            Self::Week => TimeDelta::weeks(1),
            Self::Fixed(width) => *width,
        }
    }

    fn width_secs(&self) -> i64 {
        match self {
            Self::Hour => SECS_PER_HOUR,
            Self::Day => SECS_PER_DAY,
            Self::Week => SECS_PER_WEEK,
            Self::Fixed(width) => width.num_seconds(),
        }
    }

    fn anchor_secs(&self) -> i64 {
        match self {
            Self::Week => MONDAY_ANCHOR_SECS,
            _ => 0,
        }
    }

    /// Start of the bucket containing `ts`.
    ///
    /// Callers must have validated `Fixed` windows first.
    pub fn floor(&self, ts: Timestamp) -> Timestamp {
        let width = self.width_secs().max(1);
        let secs = ts.and_utc().timestamp();
        let into_bucket = (secs - self.anchor_secs()).rem_euclid(width);
        let back = TimeDelta::seconds(into_bucket) + TimeDelta::nanoseconds(i64::from(ts.nanosecond()));
        ts.checked_sub_signed(back).unwrap_or(NaiveDateTime::MIN)
    }

    /// `[start, end)` of the bucket containing `ts`.
    pub fn bounds(&self, ts: Timestamp) -> (Timestamp, Timestamp) {
        let start = self.floor(ts);
        let end = start
            .checked_add_signed(self.width())
            .unwrap_or(NaiveDateTime::MAX);
        (start, end)
    }
}

impl fmt::Display for BucketWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour => write!(f, "hourly"),
            Self::Day => write!(f, "daily"),
            Self::Week => write!(f, "weekly"),
            Self::Fixed(width) => write!(f, "{}s", width.num_seconds()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    // ── parse_timestamp ───────────────────────────────────────────────────────

    #[test]
    fn test_parse_iso_space_separated() {
        assert_eq!(
            parse_timestamp("2024-01-15 09:30:00"),
            Some(ts("2024-01-15 09:30:00"))
        );
    }

    #[test]
    fn test_parse_iso_t_separated_with_fraction() {
        let parsed = parse_timestamp("2024-01-15T09:30:00.250").unwrap();
        assert_eq!(parsed.format("%H:%M:%S%.3f").to_string(), "09:30:00.250");
    }

    #[test]
    fn test_parse_minutes_only() {
        assert_eq!(
            parse_timestamp("2024-01-15 09:30"),
            Some(ts("2024-01-15 09:30:00"))
        );
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_clock() {
        // Offset is dropped, the written 09:00 is what buckets see.
        assert_eq!(
            parse_timestamp("2024-01-15T09:00:00+05:00"),
            Some(ts("2024-01-15 09:00:00"))
        );
        assert_eq!(
            parse_timestamp("2024-01-15T09:00:00Z"),
            Some(ts("2024-01-15 09:00:00"))
        );
    }

    #[test]
    fn test_parse_month_first_slashes() {
        assert_eq!(
            parse_timestamp("01/02/2024 08:15"),
            Some(ts("2024-01-02 08:15:00"))
        );
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        assert_eq!(parse_timestamp("2024-03-01"), Some(ts("2024-03-01 00:00:00")));
    }

    #[test]
    fn test_parse_strips_whitespace_and_bom() {
        assert_eq!(
            parse_timestamp("\u{feff} 2024-01-15 09:30:00 "),
            Some(ts("2024-01-15 09:30:00"))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("Timestamp").is_none());
        assert!(parse_timestamp("2024-13-45 99:00").is_none());
    }

    // ── BucketWindow::floor ───────────────────────────────────────────────────

    #[test]
    fn test_floor_hour() {
        assert_eq!(
            BucketWindow::Hour.floor(ts("2024-01-15 09:59:59")),
            ts("2024-01-15 09:00:00")
        );
    }

    #[test]
    fn test_floor_day() {
        assert_eq!(
            BucketWindow::Day.floor(ts("2024-01-15 23:59:59")),
            ts("2024-01-15 00:00:00")
        );
        assert_eq!(
            BucketWindow::Day.floor(ts("2024-01-16 00:00:00")),
            ts("2024-01-16 00:00:00")
        );
    }

    #[test]
    fn test_floor_week_starts_monday() {
        // 2024-01-14 is a Sunday, 2024-01-15 a Monday.
        let sunday = BucketWindow::Week.floor(ts("2024-01-14 18:00:00"));
        assert_eq!(sunday, ts("2024-01-08 00:00:00"));
        assert_eq!(sunday.weekday(), Weekday::Mon);

        let monday = BucketWindow::Week.floor(ts("2024-01-15 00:00:00"));
        assert_eq!(monday, ts("2024-01-15 00:00:00"));
    }

    #[test]
    fn test_floor_week_before_epoch() {
        let floored = BucketWindow::Week.floor(ts("1969-12-31 12:00:00"));
        assert_eq!(floored, ts("1969-12-29 00:00:00"));
        assert_eq!(floored.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_floor_drops_subsecond() {
        let t = parse_timestamp("2024-01-15T09:30:00.750").unwrap();
        assert_eq!(BucketWindow::Hour.floor(t), ts("2024-01-15 09:00:00"));
    }

    #[test]
    fn test_floor_fixed_fifteen_minutes() {
        let window = BucketWindow::Fixed(TimeDelta::minutes(15));
        assert_eq!(window.floor(ts("2024-01-15 09:44:00")), ts("2024-01-15 09:30:00"));
    }

    #[test]
    fn test_bounds_are_half_open() {
        let (start, end) = BucketWindow::Day.bounds(ts("2024-01-15 12:00:00"));
        assert_eq!(start, ts("2024-01-15 00:00:00"));
        assert_eq!(end, ts("2024-01-16 00:00:00"));
    }

    // ── BucketWindow::validate ────────────────────────────────────────────────

    #[test]
    fn test_validate_rejects_zero_width() {
        let err = BucketWindow::Fixed(TimeDelta::zero()).validate().unwrap_err();
        assert!(matches!(err, EnergyError::InvalidBucketWindow(_)));
    }

    #[test]
    fn test_validate_rejects_negative_width() {
        assert!(BucketWindow::Fixed(TimeDelta::hours(-1)).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_subsecond_width() {
        assert!(BucketWindow::Fixed(TimeDelta::milliseconds(1500))
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_accepts_calendar_windows() {
        assert!(BucketWindow::Hour.validate().is_ok());
        assert!(BucketWindow::Day.validate().is_ok());
        assert!(BucketWindow::Week.validate().is_ok());
        assert!(BucketWindow::Fixed(TimeDelta::minutes(30)).validate().is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(BucketWindow::Day.to_string(), "daily");
        assert_eq!(BucketWindow::Fixed(TimeDelta::minutes(15)).to_string(), "900s");
    }
}
