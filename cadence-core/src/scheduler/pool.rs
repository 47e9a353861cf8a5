//! Running sequence pool
//!
//! Fixed set of slots, each tracking one sequence in playback. Slots refer
//! to their sequence by id, so clearing the store never leaves a dangling
//! reference: the slot simply finds nothing to play and is retired.
//!
//! Times are milliseconds from a free-running `u32` counter. All arithmetic
//! is relative to the slot's start time with wrapping subtraction, so the
//! counter rolling over mid-sequence is harmless.

use crate::config::MAX_RUNNING;

/// Reasons a sequence could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    /// Sequence already occupies a slot
    AlreadyRunning,
    /// Every slot is occupied
    NoFreeSlot,
    /// Sequence id is not in the store
    UnknownSequence,
}

/// Playback state of one running sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunningSlot {
    /// Sequence being played
    pub sequence_id: u32,
    /// Counter value when playback started
    pub start_ms: u32,
    /// Elapsed time up to which cues have been dispatched
    dispatched_through: Option<u32>,
}

impl RunningSlot {
    fn new(sequence_id: u32, start_ms: u32) -> Self {
        Self {
            sequence_id,
            start_ms,
            dispatched_through: None,
        }
    }

    /// Milliseconds since playback started
    pub fn elapsed_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.start_ms)
    }

    /// Whether a cue at `offset_ms` falls in the window for this evaluation
    ///
    /// The window is `(previous evaluation, now]`. The first evaluation also
    /// includes the start instant so offset zero fires immediately.
    pub fn is_due(&self, offset_ms: u32, now_ms: u32) -> bool {
        let elapsed = self.elapsed_ms(now_ms);
        match self.dispatched_through {
            None => offset_ms <= elapsed,
            Some(prev) => prev < offset_ms && offset_ms <= elapsed,
        }
    }

    /// Record that everything up to `now_ms` has been dispatched
    pub fn advance(&mut self, now_ms: u32) {
        self.dispatched_through = Some(self.elapsed_ms(now_ms));
    }
}

/// Fixed-capacity pool of running sequences
#[derive(Debug, Clone)]
pub struct RunningPool {
    slots: [Option<RunningSlot>; MAX_RUNNING],
}

impl Default for RunningPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningPool {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_RUNNING],
        }
    }

    /// Claim the lowest free slot for `sequence_id`
    ///
    /// Returns the slot index.
    pub fn start(&mut self, sequence_id: u32, now_ms: u32) -> Result<usize, StartError> {
        if self.is_running(sequence_id) {
            return Err(StartError::AlreadyRunning);
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(StartError::NoFreeSlot)?;
        self.slots[index] = Some(RunningSlot::new(sequence_id, now_ms));
        Ok(index)
    }

    /// Free a slot, returning what it held
    pub fn release(&mut self, index: usize) -> Option<RunningSlot> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Free every slot
    pub fn clear(&mut self) {
        self.slots = [None; MAX_RUNNING];
    }

    pub fn is_running(&self, sequence_id: u32) -> bool {
        self.iter().any(|(_, s)| s.sequence_id == sequence_id)
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, index: usize) -> Option<&RunningSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RunningSlot> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Occupied slots with their indices, lowest index first
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RunningSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lowest_free_slot() {
        let mut pool = RunningPool::new();
        assert_eq!(pool.start(10, 0), Ok(0));
        assert_eq!(pool.start(11, 0), Ok(1));
        assert_eq!(pool.start(12, 0), Ok(2));
        pool.release(1);
        assert_eq!(pool.start(13, 0), Ok(1));
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut pool = RunningPool::new();
        pool.start(3, 100).unwrap();
        assert_eq!(pool.start(3, 200), Err(StartError::AlreadyRunning));
        assert_eq!(pool.occupied(), 1);
        assert!(pool.is_running(3));
        assert_eq!(pool.get(0).unwrap().start_ms, 100);
    }

    #[test]
    fn test_full_pool() {
        let mut pool = RunningPool::new();
        for id in 1..=MAX_RUNNING as u32 {
            pool.start(id, 0).unwrap();
        }
        assert_eq!(pool.start(7, 0), Err(StartError::NoFreeSlot));
        assert_eq!(pool.occupied(), MAX_RUNNING);
        assert!(!pool.is_running(7));
    }

    #[test]
    fn test_due_window() {
        let mut slot = RunningSlot::new(1, 1000);
        // First evaluation includes the start instant
        assert!(slot.is_due(0, 1000));
        assert!(!slot.is_due(10, 1000));
        slot.advance(1000);

        assert!(!slot.is_due(0, 1010));
        assert!(slot.is_due(10, 1010));
        slot.advance(1010);
        assert!(!slot.is_due(10, 1020));
    }

    #[test]
    fn test_due_window_across_counter_wrap() {
        let start = u32::MAX - 5;
        let mut slot = RunningSlot::new(1, start);
        assert!(slot.is_due(0, start));
        slot.advance(start);

        let now = start.wrapping_add(20);
        assert_eq!(now, 14);
        assert_eq!(slot.elapsed_ms(now), 20);
        assert!(slot.is_due(10, now));
        assert!(!slot.is_due(30, now));
    }

    proptest! {
        #[test]
        fn prop_offset_due_exactly_once(
            start in any::<u32>(),
            offset in 0u32..50_000,
            step in 10u32..500,
        ) {
            let mut slot = RunningSlot::new(1, start);
            let mut fired = 0;
            let mut elapsed = 0u32;
            while elapsed <= offset + step {
                let now = start.wrapping_add(elapsed);
                if slot.is_due(offset, now) {
                    fired += 1;
                }
                slot.advance(now);
                elapsed += step;
            }
            prop_assert_eq!(fired, 1);
        }
    }
}
