//! Show persistence
//!
//! Writes the store out in the record format and loads it back. Loading
//! appends to whatever is already in the store; clear it first to replace
//! a show.

use core::fmt::{self, Write};

use cadence_protocol::{
    record::{self, CueRecord, ScheduleRecord},
    RecordError,
};

use super::store::{Sequence, SequenceStore, StoreError};

/// Show load errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Line framing is wrong
    Record(RecordError),
    /// Store refused a cue or schedule
    Store(StoreError),
}

impl From<RecordError> for LoadError {
    fn from(e: RecordError) -> Self {
        LoadError::Record(e)
    }
}

impl From<StoreError> for LoadError {
    fn from(e: StoreError) -> Self {
        LoadError::Store(e)
    }
}

/// Write the schedule table
pub fn write_schedules<W: Write>(store: &SequenceStore, out: &mut W) -> fmt::Result {
    record::write_schedule_header(out)?;
    for schedule in store.schedules() {
        ScheduleRecord {
            sequence_id: schedule.sequence_id(),
            pattern: schedule.text(),
        }
        .write_to(out)?;
    }
    Ok(())
}

/// Write one sequence file
pub fn write_sequence<W: Write>(sequence: &Sequence, out: &mut W) -> fmt::Result {
    record::write_sequence_header(out, sequence.id())?;
    for (index, cue) in sequence.cues().iter().enumerate() {
        let text = cue.encode();
        CueRecord {
            index: index as u32,
            cue: &text,
        }
        .write_to(out)?;
    }
    Ok(())
}

/// Load a schedule table into the store
///
/// Returns the number of schedules added. Stops at the first bad line;
/// lines before it stay loaded.
pub fn load_schedules(store: &mut SequenceStore, text: &str) -> Result<usize, LoadError> {
    let mut added = 0;
    for line in record::schedule_lines(text)? {
        let rec = ScheduleRecord::parse(line)?;
        store.add_schedule(rec.sequence_id, rec.pattern)?;
        added += 1;
    }
    Ok(added)
}

/// Load a sequence file into the store
///
/// Cues are appended in file order, the record index is informational.
/// Returns the sequence id.
pub fn load_sequence(store: &mut SequenceStore, text: &str) -> Result<u32, LoadError> {
    let (id, lines) = record::sequence_lines(text)?;
    store.add_sequence(id)?;
    for line in lines {
        let rec = CueRecord::parse(line)?;
        store.append_cue(id, rec.cue)?;
    }
    Ok(id)
}
