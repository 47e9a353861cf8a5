//! Cue text format
//!
//! A cue is a single timed instruction inside a sequence. Its text form is
//! exactly [`CUE_LEN`] ASCII bytes:
//!
//! ```text
//! $ 00050 MOT 01 050 00100 %
//! │   │    │   │   │    │  └─ terminator
//! │   │    │   │   │    └──── duration, 10 ms units
//! │   │    │   │   └───────── percent
//! │   │    │   └───────────── device id
//! │   │    └───────────────── type code
//! │   └────────────────────── offset from sequence start, 10 ms units
//! └────────────────────────── start marker
//! ```

use core::fmt::Write;

use heapless::String;

use crate::parse_digits;

/// Length of a cue in bytes
pub const CUE_LEN: usize = 20;

/// Milliseconds per offset/duration unit
pub const MS_PER_UNIT: u32 = 10;

const MAX_OFFSET: u32 = 99_999;
const MAX_DEVICE: u8 = 99;
const MAX_PERCENT: u16 = 999;
const MAX_DURATION: u32 = 99_999;

/// Cue parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CueError {
    /// Input is not exactly 20 bytes
    Length,
    /// Markers, digits or type code are malformed
    Format,
}

/// What a cue actuates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CueKind {
    /// Motor controller speed (`MOT`)
    Motor,
    /// Relay output (`REL`)
    Relay,
    /// DMX channel level (`DMX`)
    Dmx,
    /// Unrecognized code, kept so the cue re-encodes unchanged
    Unknown([u8; 3]),
}

impl CueKind {
    /// Decode a three letter type code
    pub fn from_code(code: [u8; 3]) -> Self {
        match &code {
            b"MOT" => CueKind::Motor,
            b"REL" => CueKind::Relay,
            b"DMX" => CueKind::Dmx,
            _ => CueKind::Unknown(code),
        }
    }

    /// The three letter type code
    pub fn code(&self) -> [u8; 3] {
        match self {
            CueKind::Motor => *b"MOT",
            CueKind::Relay => *b"REL",
            CueKind::Dmx => *b"DMX",
            CueKind::Unknown(code) => *code,
        }
    }
}

/// A parsed cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cue {
    offset_ticks: u32,
    kind: CueKind,
    device_id: u8,
    percent: u16,
    duration_ticks: u32,
}

impl Cue {
    /// Build a cue from field values
    ///
    /// Fails with [`CueError::Format`] if a value does not fit its field
    /// width or an unknown type code is not printable ASCII.
    pub fn new(
        offset_ticks: u32,
        kind: CueKind,
        device_id: u8,
        percent: u16,
        duration_ticks: u32,
    ) -> Result<Self, CueError> {
        let code_ok = kind.code().iter().all(|b| b.is_ascii_graphic() && *b != b'%');
        if offset_ticks > MAX_OFFSET
            || device_id > MAX_DEVICE
            || percent > MAX_PERCENT
            || duration_ticks > MAX_DURATION
            || !code_ok
        {
            return Err(CueError::Format);
        }
        Ok(Self {
            offset_ticks,
            kind,
            device_id,
            percent,
            duration_ticks,
        })
    }

    /// Parse a cue from its 20 byte text form
    pub fn parse(s: &str) -> Result<Self, CueError> {
        let b = s.as_bytes();
        if b.len() != CUE_LEN {
            return Err(CueError::Length);
        }
        if b[0] != b'$' || b[CUE_LEN - 1] != b'%' {
            return Err(CueError::Format);
        }

        let offset = parse_digits(&b[1..6]).ok_or(CueError::Format)?;
        let code = [b[6], b[7], b[8]];
        let device = parse_digits(&b[9..11]).ok_or(CueError::Format)?;
        let percent = parse_digits(&b[11..14]).ok_or(CueError::Format)?;
        let duration = parse_digits(&b[14..19]).ok_or(CueError::Format)?;

        Self::new(
            offset,
            CueKind::from_code(code),
            device as u8,
            percent as u16,
            duration,
        )
    }

    /// Encode back to the 20 byte text form
    pub fn encode(&self) -> String<CUE_LEN> {
        let mut out = String::new();
        let code = self.kind.code();
        // Field widths are enforced by `new`, so the text always fits
        let _ = write!(
            out,
            "${:05}{}{}{}{:02}{:03}{:05}%",
            self.offset_ticks,
            code[0] as char,
            code[1] as char,
            code[2] as char,
            self.device_id,
            self.percent,
            self.duration_ticks
        );
        out
    }

    /// Offset from sequence start in 10 ms units
    pub fn offset_ticks(&self) -> u32 {
        self.offset_ticks
    }

    /// Offset from sequence start in milliseconds
    pub fn offset_ms(&self) -> u32 {
        self.offset_ticks * MS_PER_UNIT
    }

    pub fn kind(&self) -> CueKind {
        self.kind
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn percent(&self) -> u16 {
        self.percent
    }

    /// Duration in 10 ms units (carried for round-tripping, not acted on)
    pub fn duration_ticks(&self) -> u32 {
        self.duration_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_motor_cue() {
        let cue = Cue::parse("$00000MOT0105012300%").unwrap();
        assert_eq!(cue.offset_ticks(), 0);
        assert_eq!(cue.kind(), CueKind::Motor);
        assert_eq!(cue.device_id(), 1);
        assert_eq!(cue.percent(), 50);
        assert_eq!(cue.duration_ticks(), 12300);
    }

    #[test]
    fn test_offset_is_ten_ms_units() {
        let cue = Cue::parse("$00150REL0310000000%").unwrap();
        assert_eq!(cue.kind(), CueKind::Relay);
        assert_eq!(cue.offset_ms(), 1500);
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let cue = Cue::parse("$00000XYZ0105000000%").unwrap();
        assert_eq!(cue.kind(), CueKind::Unknown(*b"XYZ"));
        assert_eq!(cue.encode().as_str(), "$00000XYZ0105000000%");
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(Cue::parse(""), Err(CueError::Length));
        assert_eq!(Cue::parse("$0000MOT0105000000%"), Err(CueError::Length));
        assert_eq!(Cue::parse("$00000MOT0105012300%\r"), Err(CueError::Length));
    }

    #[test]
    fn test_bad_markers() {
        assert_eq!(Cue::parse("#00000MOT0105012300%"), Err(CueError::Format));
        assert_eq!(Cue::parse("$00000MOT0105012300#"), Err(CueError::Format));
    }

    #[test]
    fn test_non_digit_field() {
        assert_eq!(Cue::parse("$000A0MOT0105012300%"), Err(CueError::Format));
        assert_eq!(Cue::parse("$00000MOT0X05012300%"), Err(CueError::Format));
    }

    #[test]
    fn test_new_rejects_oversized_fields() {
        assert_eq!(
            Cue::new(100_000, CueKind::Motor, 1, 50, 0),
            Err(CueError::Format)
        );
        assert_eq!(Cue::new(0, CueKind::Dmx, 100, 50, 0), Err(CueError::Format));
        assert!(Cue::new(99_999, CueKind::Dmx, 99, 999, 99_999).is_ok());
    }

    proptest! {
        #[test]
        fn prop_valid_cues_round_trip(s in r"\$[0-9]{5}(MOT|REL|DMX|[A-Z]{3})[0-9]{10}%") {
            let cue = Cue::parse(&s).unwrap();
            let encoded = cue.encode();
            prop_assert_eq!(encoded.as_str(), s.as_str());
        }

        #[test]
        fn prop_other_lengths_fail(s in "[ -~]{0,40}") {
            prop_assume!(s.len() != CUE_LEN);
            prop_assert_eq!(Cue::parse(&s), Err(CueError::Length));
        }
    }
}
