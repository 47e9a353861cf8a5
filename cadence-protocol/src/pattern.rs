//! Schedule pattern format
//!
//! A schedule pattern is a calendar predicate in fixed-width text:
//!
//! ```text
//! $ YYYY MM DD WWW HH MM SS %
//! ```
//!
//! Any numeric field written entirely as `*` matches every value. The
//! weekday field takes `MON`..`SUN`, `WDY` (Monday through Saturday) or
//! `***`. Other weekday codes parse but never match, so a schedule with a
//! typo in its weekday simply never fires.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use crate::{parse_digits, trim_line};

/// Length of a schedule pattern in bytes
pub const PATTERN_LEN: usize = 19;

/// Schedule pattern parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Input is not exactly 19 bytes after trimming
    Length,
    /// Markers or fields are malformed
    Format,
}

/// One numeric calendar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// Wildcard, matches anything
    Any,
    /// Matches exactly this value
    Value(u16),
}

impl Field {
    fn parse(bytes: &[u8]) -> Result<Self, ScheduleError> {
        if bytes.iter().all(|&b| b == b'*') {
            return Ok(Field::Any);
        }
        parse_digits(bytes)
            .map(|v| Field::Value(v as u16))
            .ok_or(ScheduleError::Format)
    }

    /// Check a calendar value against this field
    pub fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Value(v) => *v as u32 == value,
        }
    }
}

/// Day of the week, Monday first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Weekday field of a schedule pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WeekdayField {
    /// `***`
    Any,
    /// A single named day
    On(DayOfWeek),
    /// Inclusive range of days
    Range(DayOfWeek, DayOfWeek),
    /// Unrecognized code, never matches
    Unrecognized([u8; 3]),
}

impl WeekdayField {
    /// `WDY`: every working day of the show week, Monday to Saturday
    pub const ALL_WEEKDAYS: Self = WeekdayField::Range(DayOfWeek::Monday, DayOfWeek::Saturday);

    fn parse(code: [u8; 3]) -> Self {
        match &code {
            b"***" => WeekdayField::Any,
            b"MON" => WeekdayField::On(DayOfWeek::Monday),
            b"TUE" => WeekdayField::On(DayOfWeek::Tuesday),
            b"WED" => WeekdayField::On(DayOfWeek::Wednesday),
            b"THU" => WeekdayField::On(DayOfWeek::Thursday),
            b"FRI" => WeekdayField::On(DayOfWeek::Friday),
            b"SAT" => WeekdayField::On(DayOfWeek::Saturday),
            b"SUN" => WeekdayField::On(DayOfWeek::Sunday),
            b"WDY" => Self::ALL_WEEKDAYS,
            _ => WeekdayField::Unrecognized(code),
        }
    }

    pub fn matches(&self, day: DayOfWeek) -> bool {
        match self {
            WeekdayField::Any => true,
            WeekdayField::On(d) => *d == day,
            WeekdayField::Range(first, last) => (*first..=*last).contains(&day),
            WeekdayField::Unrecognized(_) => false,
        }
    }
}

/// Parsed schedule pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulePattern {
    pub year: Field,
    pub month: Field,
    pub day: Field,
    pub weekday: WeekdayField,
    pub hour: Field,
    pub minute: Field,
    pub second: Field,
}

impl SchedulePattern {
    /// A pattern that matches every second
    pub const ALWAYS: Self = Self {
        year: Field::Any,
        month: Field::Any,
        day: Field::Any,
        weekday: WeekdayField::Any,
        hour: Field::Any,
        minute: Field::Any,
        second: Field::Any,
    };

    /// Parse pattern text
    ///
    /// Trailing whitespace and control characters are ignored.
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let b = trim_line(s).as_bytes();
        if b.len() != PATTERN_LEN {
            return Err(ScheduleError::Length);
        }
        if b[0] != b'$' || b[PATTERN_LEN - 1] != b'%' {
            return Err(ScheduleError::Format);
        }

        Ok(Self {
            year: Field::parse(&b[1..5])?,
            month: Field::parse(&b[5..7])?,
            day: Field::parse(&b[7..9])?,
            weekday: WeekdayField::parse([b[9], b[10], b[11]]),
            hour: Field::parse(&b[12..14])?,
            minute: Field::parse(&b[14..16])?,
            second: Field::parse(&b[16..18])?,
        })
    }

    /// Check whether a calendar time satisfies every field
    pub fn matches(&self, t: &NaiveDateTime) -> bool {
        let year_ok = match self.year {
            Field::Any => true,
            Field::Value(y) => t.year() == y as i32,
        };
        year_ok
            && self.month.matches(t.month())
            && self.day.matches(t.day())
            && self.weekday.matches(t.weekday().into())
            && self.hour.matches(t.hour())
            && self.minute.matches(t.minute())
            && self.second.matches(t.second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_fields() {
        let p = SchedulePattern::parse("$20240612WED120030%").unwrap();
        assert_eq!(p.year, Field::Value(2024));
        assert_eq!(p.month, Field::Value(6));
        assert_eq!(p.day, Field::Value(12));
        assert_eq!(p.weekday, WeekdayField::On(DayOfWeek::Wednesday));
        assert_eq!(p.hour, Field::Value(12));
        assert_eq!(p.minute, Field::Value(0));
        assert_eq!(p.second, Field::Value(30));
    }

    #[test]
    fn test_all_wildcards() {
        let p = SchedulePattern::parse("$*****************%").unwrap();
        assert_eq!(p, SchedulePattern::ALWAYS);
        assert!(p.matches(&at(1999, 12, 31, 23, 59, 59)));
        assert!(p.matches(&at(2024, 2, 29, 0, 0, 0)));
    }

    #[test]
    fn test_wdy_covers_monday_to_saturday() {
        let p = SchedulePattern::parse("$********WDY120000%").unwrap();
        // 2024-06-10 is a Monday
        for day in 10..=15 {
            assert!(p.matches(&at(2024, 6, day, 12, 0, 0)), "day {}", day);
        }
        assert!(!p.matches(&at(2024, 6, 16, 12, 0, 0)));
        assert!(!p.matches(&at(2024, 6, 12, 12, 0, 1)));
    }

    #[test]
    fn test_unrecognized_weekday_never_matches() {
        let p = SchedulePattern::parse("$********XYZ******%").unwrap();
        assert_eq!(p.weekday, WeekdayField::Unrecognized(*b"XYZ"));
        assert!(!p.matches(&at(2024, 6, 12, 12, 0, 0)));
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert!(SchedulePattern::parse("$********SUN******%\r\n").is_ok());
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            SchedulePattern::parse("$****"),
            Err(ScheduleError::Length)
        );
        assert_eq!(
            SchedulePattern::parse("#********WDY120000%"),
            Err(ScheduleError::Format)
        );
        assert_eq!(
            SchedulePattern::parse("$********WDY1200*0%"),
            Err(ScheduleError::Format)
        );
    }

    proptest! {
        #[test]
        fn prop_wildcard_matches_any_time(secs in 0i64..4_102_444_800i64) {
            let t = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
            prop_assert!(SchedulePattern::ALWAYS.matches(&t));
        }
    }
}
