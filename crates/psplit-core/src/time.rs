//! Time-of-day grammar shared by every input surface.
//!
//! Accepted notations, all of which must land on a quarter hour:
//! - `18`: a whole hour
//! - `18:15`: colon notation, literal clock minutes
//! - `18.25` / `18,25`: a decimal fraction of an hour (`.5` is half past)
//!
//! Hours run from 0 to 47; `24` is the midnight that closes the day and
//! later hours belong to the following morning (`25:30` is 01:30).
//!
//! `18.30` is rejected on purpose: as a decimal it means 18:18, which is
//! almost never what the writer meant. The error suggests `18:30` instead.

use std::fmt;
use std::ops::Sub;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use thiserror::Error;

const QUARTER_MINUTES: u32 = 15;
const MINUTES_PER_DAY: u32 = 24 * 60;
const HALF_DAY_MINUTES: u32 = 12 * 60;
pub const MAX_HOUR: u32 = 47;

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?:([.,:])(\d{1,2}))?$").unwrap());

/// A wall-clock time counted in minutes from the midnight that opens the
/// booking day. Unlike a plain time of day it can reach 24:00 and beyond, so
/// late bookings stay ordered after their start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime {
    minutes: u32,
}

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime { minutes: 0 };

    /// `None` when the hour is past [`MAX_HOUR`] or the minute past 59.
    pub const fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > MAX_HOUR || minute >= 60 {
            None
        } else {
            Some(Self {
                minutes: hour * 60 + minute,
            })
        }
    }

    pub const fn minutes(self) -> u32 {
        self.minutes
    }

    pub const fn hour(self) -> u32 {
        self.minutes / 60
    }

    pub const fn minute(self) -> u32 {
        self.minutes % 60
    }

    /// True for 24:00 and later.
    pub const fn is_next_day(self) -> bool {
        self.minutes >= MINUTES_PER_DAY
    }

    /// The same clock reading one day later.
    pub const fn next_day(self) -> Self {
        Self {
            minutes: self.minutes + MINUTES_PER_DAY,
        }
    }
}

impl Sub for ClockTime {
    type Output = TimeDelta;

    fn sub(self, rhs: Self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.minutes) - i64::from(rhs.minutes))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = TimeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_time(value)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors produced by [`parse_time`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("time is empty")]
    Empty,
    #[error("unrecognised time '{0}' (use e.g. 18, 18:15, 18.5 or 18,75)")]
    Unrecognized(String),
    #[error("hour {0} is out of range (0-47; 24 and later mean the next day)")]
    HourOutOfRange(u32),
    #[error("'{0}' has more than 59 minutes")]
    MinuteOutOfRange(String),
    #[error(
        "'{input}' resolves to {minutes} minutes past the hour; only :00, :15, :30 and :45 are accepted"
    )]
    OffQuarterHour { input: String, minutes: u32 },
    #[error(
        "'{input}' is read as a fraction of an hour; write {colon} (or {decimal}) for clock minutes"
    )]
    ClockMinutesAsDecimal {
        input: String,
        colon: String,
        decimal: String,
    },
}

/// Parse a time written in any of the accepted notations.
pub fn parse_time(input: &str) -> Result<ClockTime, TimeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let captures = TIME_PATTERN
        .captures(trimmed)
        .ok_or_else(|| TimeParseError::Unrecognized(trimmed.to_string()))?;

    let hour: u32 = captures[1]
        .parse()
        .map_err(|_| TimeParseError::Unrecognized(trimmed.to_string()))?;
    if hour > MAX_HOUR {
        return Err(TimeParseError::HourOutOfRange(hour));
    }

    let minutes = match (captures.get(2), captures.get(3)) {
        (None, _) | (_, None) => 0,
        (Some(separator), Some(digits)) if separator.as_str() == ":" => {
            clock_minutes(trimmed, digits.as_str())?
        }
        (Some(separator), Some(digits)) => {
            fractional_minutes(trimmed, hour, separator.as_str(), digits.as_str())?
        }
    };

    if minutes % QUARTER_MINUTES != 0 {
        return Err(TimeParseError::OffQuarterHour {
            input: trimmed.to_string(),
            minutes,
        });
    }

    ClockTime::from_hm(hour, minutes)
        .ok_or_else(|| TimeParseError::Unrecognized(trimmed.to_string()))
}

fn clock_minutes(input: &str, digits: &str) -> Result<u32, TimeParseError> {
    if digits.len() != 2 {
        return Err(TimeParseError::Unrecognized(input.to_string()));
    }
    let minutes: u32 = digits
        .parse()
        .map_err(|_| TimeParseError::Unrecognized(input.to_string()))?;
    if minutes >= 60 {
        return Err(TimeParseError::MinuteOutOfRange(input.to_string()));
    }
    Ok(minutes)
}

// "5" -> 30, "25" -> 15, "75" -> 45. Fractions that do not map to whole
// minutes are reported as off-quarter with the truncated minute count.
fn fractional_minutes(
    input: &str,
    hour: u32,
    separator: &str,
    digits: &str,
) -> Result<u32, TimeParseError> {
    let numerator: u32 = digits
        .parse()
        .map_err(|_| TimeParseError::Unrecognized(input.to_string()))?;
    let denominator = 10u32.pow(digits.len() as u32);
    let scaled = numerator * 60;
    if scaled % denominator == 0 && (scaled / denominator) % QUARTER_MINUTES == 0 {
        return Ok(scaled / denominator);
    }

    let fraction = match (digits.len(), numerator) {
        (2, 15) => Some("25"),
        (2, 30) => Some("5"),
        (2, 45) => Some("75"),
        _ => None,
    };
    if let Some(fraction) = fraction {
        return Err(TimeParseError::ClockMinutesAsDecimal {
            input: input.to_string(),
            colon: format!("{hour}:{digits}"),
            decimal: format!("{hour}{separator}{fraction}"),
        });
    }
    Err(TimeParseError::OffQuarterHour {
        input: input.to_string(),
        minutes: scaled / denominator,
    })
}

/// Read `time` relative to a booking that opens at `start`. A time written
/// more than half a day before the start belongs to the next morning: `23`
/// to `0:30` is a ninety-minute booking, while `18` to `17` stays inverted.
pub fn roll_past_midnight(start: ClockTime, time: ClockTime) -> ClockTime {
    if !time.is_next_day() && start.minutes() > time.minutes() + HALF_DAY_MINUTES {
        time.next_day()
    } else {
        time
    }
}

/// `HH:MM` rendering used in tables and notices. Next-day times keep
/// counting (`24:30`), matching what [`parse_time`] accepts.
pub fn format_time(time: ClockTime) -> String {
    time.to_string()
}

/// Render a duration as `2h 05m`.
pub fn format_duration(duration: TimeDelta) -> String {
    let minutes = duration.num_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Convert a duration to fractional hours.
pub fn hours(duration: TimeDelta) -> Decimal {
    Decimal::from(duration.num_seconds()) / Decimal::from(3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn hm(hour: u32, minute: u32) -> ClockTime {
        ClockTime::from_hm(hour, minute).unwrap()
    }

    #[test]
    fn test_whole_hours() {
        assert_eq!(parse_time("18").unwrap(), hm(18, 0));
        assert_eq!(parse_time(" 7 ").unwrap(), hm(7, 0));
        assert_eq!(parse_time("0").unwrap(), hm(0, 0));
    }

    #[test]
    fn test_colon_notation() {
        assert_eq!(parse_time("18:15").unwrap(), hm(18, 15));
        assert_eq!(parse_time("19:30").unwrap(), hm(19, 30));
        assert_eq!(parse_time("9:45").unwrap(), hm(9, 45));
        assert_eq!(parse_time("18:00").unwrap(), hm(18, 0));
    }

    #[test]
    fn test_decimal_notation_with_either_separator() {
        assert_eq!(parse_time("18.5").unwrap(), hm(18, 30));
        assert_eq!(parse_time("18,5").unwrap(), hm(18, 30));
        assert_eq!(parse_time("18.25").unwrap(), hm(18, 15));
        assert_eq!(parse_time("18,75").unwrap(), hm(18, 45));
        assert_eq!(parse_time("18.0").unwrap(), hm(18, 0));
        assert_eq!(parse_time("18.00").unwrap(), hm(18, 0));
        assert_eq!(parse_time("18.50").unwrap(), hm(18, 30));
    }

    #[test]
    fn test_decimal_thirty_is_not_half_past() {
        let err = parse_time("18.30").unwrap_err();
        assert_eq!(
            err,
            TimeParseError::ClockMinutesAsDecimal {
                input: "18.30".to_string(),
                colon: "18:30".to_string(),
                decimal: "18.5".to_string()
            }
        );
        assert!(err.to_string().contains("write 18:30"));

        let err = parse_time("19,45").unwrap_err();
        assert!(err.to_string().contains("19:45"));
        assert!(err.to_string().contains("19,75"));
        assert!(matches!(
            parse_time("18.15"),
            Err(TimeParseError::ClockMinutesAsDecimal { .. })
        ));
    }

    #[test]
    fn test_midnight_and_next_day_hours() {
        assert_eq!(parse_time("24").unwrap(), hm(24, 0));
        assert_eq!(parse_time("24:00").unwrap(), hm(24, 0));
        assert_eq!(parse_time("24.5").unwrap(), hm(24, 30));
        assert_eq!(parse_time("25:45").unwrap(), hm(25, 45));
        assert!(hm(24, 0).is_next_day());
        assert!(!hm(23, 45).is_next_day());
        assert_eq!(hm(0, 30).next_day(), hm(24, 30));
        assert_eq!(hm(24, 0) - hm(22, 0), TimeDelta::hours(2));
        assert_eq!(parse_time("48"), Err(TimeParseError::HourOutOfRange(48)));
    }

    #[test]
    fn test_rolling_past_midnight() {
        assert_eq!(roll_past_midnight(hm(23, 0), hm(0, 30)), hm(24, 30));
        assert_eq!(roll_past_midnight(hm(22, 0), hm(1, 0)), hm(25, 0));
        assert_eq!(roll_past_midnight(hm(18, 0), hm(17, 0)), hm(17, 0));
        assert_eq!(roll_past_midnight(hm(18, 0), hm(20, 0)), hm(20, 0));
        assert_eq!(roll_past_midnight(hm(23, 0), hm(24, 15)), hm(24, 15));
    }

    #[test]
    fn test_off_quarter_inputs_are_rejected() {
        assert!(matches!(
            parse_time("18:10"),
            Err(TimeParseError::OffQuarterHour { minutes: 10, .. })
        ));
        assert!(matches!(
            parse_time("18.33"),
            Err(TimeParseError::OffQuarterHour { .. })
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(parse_time(""), Err(TimeParseError::Empty));
        assert_eq!(parse_time("   "), Err(TimeParseError::Empty));
        assert!(matches!(
            parse_time("six"),
            Err(TimeParseError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_time("18:5"),
            Err(TimeParseError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_time("18.5.5"),
            Err(TimeParseError::Unrecognized(_))
        ));
        assert_eq!(parse_time("99"), Err(TimeParseError::HourOutOfRange(99)));
        assert!(matches!(
            parse_time("18:75"),
            Err(TimeParseError::MinuteOutOfRange(_))
        ));
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(format_time(hm(9, 5)), "09:05");
        assert_eq!(format_time(hm(24, 30)), "24:30");
        assert_eq!("18:45".parse::<ClockTime>(), Ok(hm(18, 45)));
        assert_eq!(format_duration(TimeDelta::minutes(125)), "2h 05m");
        assert_eq!(format_duration(TimeDelta::zero()), "0h 00m");
        assert_eq!(hours(TimeDelta::minutes(90)), dec!(1.5));
        assert_eq!(hours(TimeDelta::hours(2)), dec!(2));
    }
}
