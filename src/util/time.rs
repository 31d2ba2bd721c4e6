//! Reference times and time units.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Julian day number of 1970-01-01T00:00:00.
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Time unit of stored dataset times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl TimeUnit {
    /// Parse a unit keyword such as `hours` or `SECONDS`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hours),
            "d" | "day" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    /// Multiplier converting a value in this unit to hours.
    pub fn to_hours(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0 / 3600.0,
            TimeUnit::Minutes => 1.0 / 60.0,
            TimeUnit::Hours => 1.0,
            TimeUnit::Days => 24.0,
        }
    }
}

/// Parse a date in any of the formats found in model output headers.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse CF-style units, e.g. `"hours since 1990-01-01 00:00:00"`.
///
/// Returns the unit and, when the date part is readable, the reference time.
pub fn parse_cf_units(units: &str) -> Option<(TimeUnit, Option<NaiveDateTime>)> {
    let (unit, since) = match units.split_once(" since ") {
        Some((unit, since)) => (unit, Some(since)),
        None => (units, None),
    };
    let unit = TimeUnit::parse(unit)?;
    Some((unit, since.and_then(parse_date)))
}

/// Convert a Julian day to a calendar date time.
pub fn from_julian_day(julian_day: f64) -> Option<NaiveDateTime> {
    let seconds = ((julian_day - UNIX_EPOCH_JULIAN_DAY) * 86_400.0).round();
    if !seconds.is_finite() {
        return None;
    }
    NaiveDate::from_ymd_opt(1970, 1, 1)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::try_seconds(seconds as i64)?)
}

/// Convert a calendar date time to a Julian day.
pub fn to_julian_day(time: NaiveDateTime) -> f64 {
    let Some(epoch) = NaiveDate::from_ymd_opt(1970, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return f64::NAN;
    };
    let seconds = (time - epoch).num_seconds() as f64;
    UNIX_EPOCH_JULIAN_DAY + seconds / 86_400.0
}

/// ISO-8601 rendering used for reference times.
pub fn to_iso8601(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cf_units_with_iso_date() {
        let (unit, reference) = parse_cf_units("hours since 1990-01-01 00:00:00").unwrap();
        assert_eq!(unit, TimeUnit::Hours);
        assert_eq!(to_iso8601(reference.unwrap()), "1990-01-01T00:00:00");
    }

    #[test]
    fn cf_units_with_day_first_date() {
        let (unit, reference) = parse_cf_units("seconds since 15/03/2011 06:30:00").unwrap();
        assert_eq!(unit, TimeUnit::Seconds);
        assert_eq!(to_iso8601(reference.unwrap()), "2011-03-15T06:30:00");
        assert!((unit.to_hours() * 7200.0 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn bare_unit_has_no_reference() {
        let (unit, reference) = parse_cf_units("days").unwrap();
        assert_eq!(unit, TimeUnit::Days);
        assert!(reference.is_none());
        assert!(parse_cf_units("fortnights since 2000-01-01").is_none());
    }

    #[test]
    fn julian_day_round_trip() {
        let t = from_julian_day(2_458_000.5).unwrap();
        assert_eq!(to_iso8601(t), "2017-09-04T00:00:00");
        assert!((to_julian_day(t) - 2_458_000.5).abs() < 1e-9);
    }
}
