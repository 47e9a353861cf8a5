//! Cadence show data formats
//!
//! Fixed-width ASCII formats shared by the scheduler, the persistence layer
//! and any operator tooling:
//!
//! - Cue: `$OOOOOTTTDDPPPDDDDD%` (20 bytes)
//!   - `O` offset from sequence start in 10 ms units
//!   - `T` three letter type code (`MOT`, `REL`, `DMX`)
//!   - `D` device id, `P` percent, `D` duration in 10 ms units
//! - Schedule pattern: `$YYYYMMDDWWWHHMMSS%` (19 bytes), any field may be
//!   a run of `*` to match anything
//! - Show records: CRLF-terminated `<id> <text>` lines
//!
//! Everything here is pure and stateless.

#![no_std]
#![deny(unsafe_code)]

// Property tests need std's macros and allocator on the host
#[cfg(test)]
#[macro_use]
extern crate std;

pub mod cue;
pub mod pattern;
pub mod record;

pub use cue::{Cue, CueError, CueKind, CUE_LEN};
pub use pattern::{DayOfWeek, Field, SchedulePattern, ScheduleError, WeekdayField, PATTERN_LEN};
pub use record::{CueRecord, RecordError, ScheduleRecord};

/// Strip trailing whitespace and control characters from raw line text
pub fn trim_line(s: &str) -> &str {
    s.trim_end_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// Parse a fixed-width run of ASCII digits
///
/// Returns `None` if any byte is not a digit.
pub(crate) fn parse_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b.is_ascii_digit() {
            Some(acc * 10 + (b - b'0') as u32)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line("$00000MOT0105012300%\r\n"), "$00000MOT0105012300%");
        assert_eq!(trim_line("abc \t\0"), "abc");
        assert_eq!(trim_line("  lead"), "  lead");
    }

    #[test]
    fn test_parse_digits() {
        assert_eq!(parse_digits(b"00123"), Some(123));
        assert_eq!(parse_digits(b"12a"), None);
        assert_eq!(parse_digits(b""), None);
    }
}
