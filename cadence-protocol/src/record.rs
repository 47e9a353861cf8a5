//! Persisted show record format
//!
//! Shows are stored as plain text so they can be inspected and edited off
//! the device. Every line ends in CRLF.
//!
//! Schedule table (`SCHEDULE.DAT`):
//!
//! ```text
//! SCHEDULE
//! 3 $********WDY120000%
//! 3 $********SAT180000%
//! ```
//!
//! Sequence file (`0003.SEQ`), header is the sequence id:
//!
//! ```text
//! 3
//! 0 $00000MOT0105012300%
//! 1 $00500REL0110000000%
//! ```

use core::fmt::{self, Write};

use heapless::String;

use crate::trim_line;

/// Header line of the schedule table
pub const SCHEDULE_HEADER: &str = "SCHEDULE";

/// File name of the schedule table
pub const SCHEDULE_FILE_NAME: &str = "SCHEDULE.DAT";

/// Extension of sequence files
pub const SEQUENCE_FILE_EXT: &str = "SEQ";

/// Record line terminator
pub const LINE_END: &str = "\r\n";

/// Record parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Line has no separator between id and text
    MissingField,
    /// Leading id is not a decimal number
    InvalidId,
    /// File does not start with the expected header
    Header,
}

/// Split `<number> <text>` into its parts
fn split_record(line: &str) -> Result<(u32, &str), RecordError> {
    let line = trim_line(line);
    let (id, text) = line.split_once(' ').ok_or(RecordError::MissingField)?;
    let id = id.parse::<u32>().map_err(|_| RecordError::InvalidId)?;
    Ok((id, text))
}

/// One line of the schedule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleRecord<'a> {
    pub sequence_id: u32,
    pub pattern: &'a str,
}

impl<'a> ScheduleRecord<'a> {
    pub fn parse(line: &'a str) -> Result<Self, RecordError> {
        let (sequence_id, pattern) = split_record(line)?;
        Ok(Self {
            sequence_id,
            pattern,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "{} {}{}", self.sequence_id, self.pattern, LINE_END)
    }
}

/// One line of a sequence file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueRecord<'a> {
    pub index: u32,
    pub cue: &'a str,
}

impl<'a> CueRecord<'a> {
    pub fn parse(line: &'a str) -> Result<Self, RecordError> {
        let (index, cue) = split_record(line)?;
        Ok(Self { index, cue })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "{} {}{}", self.index, self.cue, LINE_END)
    }
}

/// Write the schedule table header line
pub fn write_schedule_header<W: Write>(out: &mut W) -> fmt::Result {
    write!(out, "{}{}", SCHEDULE_HEADER, LINE_END)
}

/// Write a sequence file header line
pub fn write_sequence_header<W: Write>(out: &mut W, sequence_id: u32) -> fmt::Result {
    write!(out, "{}{}", sequence_id, LINE_END)
}

/// Check and strip the schedule table header
///
/// Returns the record lines that follow it.
pub fn schedule_lines(text: &str) -> Result<impl Iterator<Item = &str>, RecordError> {
    let mut lines = text.lines();
    match lines.next().map(trim_line) {
        Some(SCHEDULE_HEADER) => Ok(lines.filter(|l| !trim_line(l).is_empty())),
        _ => Err(RecordError::Header),
    }
}

/// Parse the sequence file header
///
/// Returns the sequence id and the cue record lines that follow it.
pub fn sequence_lines(text: &str) -> Result<(u32, impl Iterator<Item = &str>), RecordError> {
    let mut lines = text.lines();
    let header = lines.next().map(trim_line).ok_or(RecordError::Header)?;
    let id = header.parse::<u32>().map_err(|_| RecordError::Header)?;
    Ok((id, lines.filter(|l| !trim_line(l).is_empty())))
}

/// File name for a sequence, zero padded to four digits
pub fn sequence_file_name(sequence_id: u32) -> String<16> {
    let mut name = String::new();
    let _ = write!(name, "{:04}.{}", sequence_id, SEQUENCE_FILE_EXT);
    name
}

/// Recover the sequence id from a sequence file name
pub fn sequence_id_from_file_name(name: &str) -> Option<u32> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case(SEQUENCE_FILE_EXT) {
        return None;
    }
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_record() {
        let rec = ScheduleRecord::parse("3 $********WDY120000%\r\n").unwrap();
        assert_eq!(rec.sequence_id, 3);
        assert_eq!(rec.pattern, "$********WDY120000%");

        let mut out: String<32> = String::new();
        rec.write_to(&mut out).unwrap();
        assert_eq!(out.as_str(), "3 $********WDY120000%\r\n");
    }

    #[test]
    fn test_record_errors() {
        assert_eq!(
            ScheduleRecord::parse("$********WDY120000%"),
            Err(RecordError::MissingField)
        );
        assert_eq!(
            CueRecord::parse("x $00000MOT0105012300%"),
            Err(RecordError::InvalidId)
        );
    }

    #[test]
    fn test_schedule_file() {
        let text = "SCHEDULE\r\n3 $********WDY120000%\r\n\r\n4 $*****************%\r\n";
        let recs: std::vec::Vec<_> = schedule_lines(text)
            .unwrap()
            .map(|l| ScheduleRecord::parse(l).unwrap())
            .collect();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].sequence_id, 4);

        assert_eq!(
            schedule_lines("3 $********WDY120000%\r\n").err(),
            Some(RecordError::Header)
        );
    }

    #[test]
    fn test_sequence_file() {
        let text = "7\r\n0 $00000MOT0105012300%\r\n1 $00500REL0110000000%\r\n";
        let (id, lines) = sequence_lines(text).unwrap();
        assert_eq!(id, 7);
        let cues: std::vec::Vec<_> = lines.map(|l| CueRecord::parse(l).unwrap()).collect();
        assert_eq!(cues[1].index, 1);
        assert_eq!(cues[1].cue, "$00500REL0110000000%");
    }

    #[test]
    fn test_sequence_file_names() {
        assert_eq!(sequence_file_name(3).as_str(), "0003.SEQ");
        assert_eq!(sequence_file_name(12345).as_str(), "12345.SEQ");
        assert_eq!(sequence_id_from_file_name("0003.SEQ"), Some(3));
        assert_eq!(sequence_id_from_file_name("SCHEDULE.DAT"), None);
    }
}
