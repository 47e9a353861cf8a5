//! Sequence and schedule storage
//!
//! Sequences are keyed by id and created on first reference, whether that
//! reference is a schedule or a cue. Every insert is bounds checked and a
//! rejected insert leaves the store untouched.

use heapless::{String, Vec};

use cadence_protocol::{trim_line, Cue, CueError, SchedulePattern, ScheduleError, PATTERN_LEN};

use crate::config::{MAX_CUES, MAX_SCHEDULES, MAX_SEQUENCES};

/// Store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Table is full
    Capacity,
    /// Cue text is malformed
    Cue(CueError),
    /// Schedule pattern text is malformed
    Schedule(ScheduleError),
}

impl From<CueError> for StoreError {
    fn from(e: CueError) -> Self {
        StoreError::Cue(e)
    }
}

impl From<ScheduleError> for StoreError {
    fn from(e: ScheduleError) -> Self {
        StoreError::Schedule(e)
    }
}

/// An ordered list of cues sharing one id
#[derive(Debug, Clone)]
pub struct Sequence {
    id: u32,
    cues: Vec<Cue, MAX_CUES>,
}

impl Sequence {
    fn new(id: u32) -> Self {
        Self {
            id,
            cues: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Cues in insertion order
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Offset of the latest cue, 0 for an empty sequence
    pub fn max_offset_ms(&self) -> u32 {
        self.cues.iter().map(Cue::offset_ms).max().unwrap_or(0)
    }
}

/// A time pattern that starts a sequence
#[derive(Debug, Clone)]
pub struct Schedule {
    sequence_id: u32,
    pattern: SchedulePattern,
    text: String<PATTERN_LEN>,
    /// Calendar second (Unix seconds) this schedule last started its sequence
    pub(crate) last_fired: Option<i64>,
}

impl Schedule {
    pub fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    pub fn pattern(&self) -> &SchedulePattern {
        &self.pattern
    }

    /// Trimmed pattern text as it was added
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Sequence and schedule tables
#[derive(Debug, Default)]
pub struct SequenceStore {
    sequences: Vec<Sequence, MAX_SEQUENCES>,
    schedules: Vec<Schedule, MAX_SCHEDULES>,
}

impl SequenceStore {
    /// Create an empty store
    pub const fn new() -> Self {
        Self {
            sequences: Vec::new(),
            schedules: Vec::new(),
        }
    }

    /// Create a sequence if it does not exist yet
    pub fn add_sequence(&mut self, id: u32) -> Result<(), StoreError> {
        self.ensure_sequence(id).map(|_| ())
    }

    fn ensure_sequence(&mut self, id: u32) -> Result<&mut Sequence, StoreError> {
        let index = match self.sequences.iter().position(|s| s.id == id) {
            Some(index) => index,
            None => {
                self.sequences
                    .push(Sequence::new(id))
                    .map_err(|_| StoreError::Capacity)?;
                self.sequences.len() - 1
            }
        };
        Ok(&mut self.sequences[index])
    }

    /// Parse a cue and append it to a sequence, creating the sequence if needed
    ///
    /// Returns the index of the new cue within its sequence.
    pub fn append_cue(&mut self, id: u32, text: &str) -> Result<usize, StoreError> {
        let cue = Cue::parse(text)?;
        if let Some(seq) = self.sequence(id) {
            if seq.cues.is_full() {
                return Err(StoreError::Capacity);
            }
        }
        let seq = self.ensure_sequence(id)?;
        seq.cues.push(cue).map_err(|_| StoreError::Capacity)?;
        Ok(seq.cues.len() - 1)
    }

    /// Parse a schedule pattern and store it, creating the sequence if needed
    pub fn add_schedule(&mut self, id: u32, text: &str) -> Result<(), StoreError> {
        let trimmed = trim_line(text);
        let pattern = SchedulePattern::parse(trimmed)?;
        if self.schedules.is_full() {
            return Err(StoreError::Capacity);
        }
        let mut stored = String::new();
        // Parse guarantees the trimmed text is exactly PATTERN_LEN bytes
        stored
            .push_str(trimmed)
            .map_err(|_| StoreError::Schedule(ScheduleError::Length))?;

        self.ensure_sequence(id)?;
        self.schedules
            .push(Schedule {
                sequence_id: id,
                pattern,
                text: stored,
                last_fired: None,
            })
            .map_err(|_| StoreError::Capacity)
    }

    /// Remove every sequence
    pub fn clear_all_sequences(&mut self) {
        self.sequences.clear();
    }

    /// Remove every schedule
    pub fn clear_all_schedules(&mut self) {
        self.schedules.clear();
    }

    /// Look up a sequence by id
    pub fn sequence(&self, id: u32) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Schedules in insertion order
    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub(crate) fn schedules_mut(&mut self) -> &mut [Schedule] {
        &mut self.schedules
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_protocol::CueKind;

    const CUE: &str = "$00000MOT0105012300%";

    #[test]
    fn test_add_sequence_is_idempotent() {
        let mut store = SequenceStore::new();
        store.add_sequence(3).unwrap();
        store.add_sequence(3).unwrap();
        assert_eq!(store.sequence_count(), 1);
    }

    #[test]
    fn test_sequence_capacity() {
        let mut store = SequenceStore::new();
        for id in 0..MAX_SEQUENCES as u32 {
            store.add_sequence(id).unwrap();
        }
        assert_eq!(store.add_sequence(999), Err(StoreError::Capacity));
        // Existing ids still accepted
        assert!(store.add_sequence(0).is_ok());
        assert_eq!(store.append_cue(999, CUE), Err(StoreError::Capacity));
    }

    #[test]
    fn test_append_creates_sequence() {
        let mut store = SequenceStore::new();
        assert_eq!(store.append_cue(3, CUE), Ok(0));
        assert_eq!(store.append_cue(3, "$00500REL0110000000%"), Ok(1));

        let seq = store.sequence(3).unwrap();
        assert_eq!(seq.cues()[0].kind(), CueKind::Motor);
        assert_eq!(seq.cues()[1].kind(), CueKind::Relay);
        assert_eq!(seq.max_offset_ms(), 5000);
    }

    #[test]
    fn test_cue_capacity() {
        let mut store = SequenceStore::new();
        for _ in 0..MAX_CUES {
            store.append_cue(1, CUE).unwrap();
        }
        assert_eq!(store.append_cue(1, CUE), Err(StoreError::Capacity));
        assert_eq!(store.sequence(1).unwrap().cues().len(), MAX_CUES);
    }

    #[test]
    fn test_rejected_cue_leaves_store_untouched() {
        let mut store = SequenceStore::new();
        assert_eq!(
            store.append_cue(5, "$00000MOT01050123%"),
            Err(StoreError::Cue(CueError::Length))
        );
        assert!(store.sequence(5).is_none());
    }

    #[test]
    fn test_add_schedule_trims_and_creates() {
        let mut store = SequenceStore::new();
        store.add_schedule(3, "$********WDY120000%\r\n").unwrap();
        assert_eq!(store.schedules()[0].text(), "$********WDY120000%");
        assert_eq!(store.schedules()[0].sequence_id(), 3);
        assert!(store.sequence(3).is_some());

        assert_eq!(
            store.add_schedule(4, "$***"),
            Err(StoreError::Schedule(ScheduleError::Length))
        );
        assert!(store.sequence(4).is_none());
    }

    #[test]
    fn test_schedule_capacity() {
        let mut store = SequenceStore::new();
        for _ in 0..MAX_SCHEDULES {
            store.add_schedule(1, "$*****************%").unwrap();
        }
        assert_eq!(
            store.add_schedule(2, "$*****************%"),
            Err(StoreError::Capacity)
        );
        assert!(store.sequence(2).is_none());
    }

    #[test]
    fn test_clear_all() {
        let mut store = SequenceStore::new();
        store.add_schedule(1, "$*****************%").unwrap();
        store.append_cue(1, CUE).unwrap();
        store.clear_all_schedules();
        assert_eq!(store.schedule_count(), 0);
        assert_eq!(store.sequence_count(), 1);
        store.clear_all_sequences();
        assert_eq!(store.sequence_count(), 0);
    }
}
