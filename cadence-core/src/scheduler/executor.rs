//! Show scheduler
//!
//! Owns the sequence store and the running pool. Each tick it matches the
//! wall clock against every schedule, starts sequences that are due, then
//! plays cues from every running slot and retires slots with nothing left
//! to play. Nothing here logs: a [`TickReport`] lists what happened so the
//! caller can.

use chrono::NaiveDateTime;
use heapless::Vec;

use super::pool::{RunningPool, RunningSlot, StartError};
use super::store::SequenceStore;
use crate::config::MAX_RUNNING;
use crate::traits::{CueSink, DispatchError, DispatchOutcome};

/// Maximum events recorded per tick, further events are only counted
pub const MAX_TICK_EVENTS: usize = 32;

/// Scheduler run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Ticks are ignored
    Stopped,
    /// Schedules and sequences are evaluated every tick
    Running,
}

/// Something the scheduler did during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerEvent {
    /// A schedule matched and its sequence took a slot
    SequenceStarted { sequence_id: u32, slot: usize },
    /// A schedule matched but every slot was busy
    NoFreeSlot { sequence_id: u32 },
    /// A cue was handed to the sink
    CueDispatched {
        sequence_id: u32,
        cue_index: usize,
        outcome: DispatchOutcome,
    },
    /// The sink refused a cue
    CueRejected {
        sequence_id: u32,
        cue_index: usize,
        error: DispatchError,
    },
    /// A slot had nothing left to play and was freed
    SequenceFinished { sequence_id: u32, slot: usize },
}

/// Record of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    events: Vec<SchedulerEvent, MAX_TICK_EVENTS>,
    dropped: u16,
}

impl TickReport {
    fn push(&mut self, event: SchedulerEvent) {
        if self.events.push(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Events in the order they happened
    pub fn events(&self) -> &[SchedulerEvent] {
        &self.events
    }

    /// Events that did not fit in the report
    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.dropped == 0
    }
}

/// Show scheduler
#[derive(Debug)]
pub struct Scheduler {
    state: RunState,
    store: SequenceStore,
    pool: RunningPool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a stopped scheduler with an empty store
    pub const fn new() -> Self {
        Self {
            state: RunState::Stopped,
            store: SequenceStore::new(),
            pool: RunningPool::new(),
        }
    }

    /// Begin evaluating schedules and sequences on each tick
    pub fn start(&mut self) {
        self.state = RunState::Running;
    }

    /// Stop evaluating; running slots are kept and resume on [`start`](Self::start)
    pub fn stop(&mut self) {
        self.state = RunState::Stopped;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn store(&self) -> &SequenceStore {
        &self.store
    }

    /// Mutable store access for loading and editing shows between ticks
    pub fn store_mut(&mut self) -> &mut SequenceStore {
        &mut self.store
    }

    /// Start a sequence by hand
    ///
    /// Returns the slot index it now occupies.
    pub fn start_sequence(&mut self, sequence_id: u32, now_ms: u32) -> Result<usize, StartError> {
        if self.store.sequence(sequence_id).is_none() {
            return Err(StartError::UnknownSequence);
        }
        self.pool.start(sequence_id, now_ms)
    }

    pub fn is_running(&self, sequence_id: u32) -> bool {
        self.pool.is_running(sequence_id)
    }

    /// Occupied slots, lowest index first
    pub fn running(&self) -> impl Iterator<Item = (usize, &RunningSlot)> {
        self.pool.iter()
    }

    /// Drop every running sequence without playing its remaining cues
    pub fn abort_all(&mut self) {
        self.pool.clear();
    }

    /// Advance the show to `now_ms`
    ///
    /// `wall_clock` is the calendar time used for schedule matching and
    /// `now_ms` the monotonic counter used for cue offsets.
    pub fn tick<S: CueSink>(
        &mut self,
        now_ms: u32,
        wall_clock: &NaiveDateTime,
        sink: &mut S,
    ) -> TickReport {
        let mut report = TickReport::default();
        if self.state == RunState::Stopped {
            return report;
        }

        self.trigger_schedules(now_ms, wall_clock, &mut report);
        self.trigger_sequences(now_ms, sink, &mut report);
        report
    }

    /// Start sequences whose schedule matches the current second
    ///
    /// A schedule fires at most once per matching second. A start that
    /// failed for lack of a slot is not latched, so it is retried on the
    /// next tick within the same second.
    fn trigger_schedules(
        &mut self,
        now_ms: u32,
        wall_clock: &NaiveDateTime,
        report: &mut TickReport,
    ) {
        let stamp = wall_clock.and_utc().timestamp();

        for index in 0..self.store.schedule_count() {
            let schedule = &self.store.schedules()[index];
            if schedule.last_fired == Some(stamp) || !schedule.pattern().matches(wall_clock) {
                continue;
            }
            let sequence_id = schedule.sequence_id();

            let latch = if self.store.sequence(sequence_id).is_none() {
                true
            } else {
                match self.pool.start(sequence_id, now_ms) {
                    Ok(slot) => {
                        report.push(SchedulerEvent::SequenceStarted { sequence_id, slot });
                        true
                    }
                    Err(StartError::NoFreeSlot) => {
                        report.push(SchedulerEvent::NoFreeSlot { sequence_id });
                        false
                    }
                    Err(StartError::AlreadyRunning) | Err(StartError::UnknownSequence) => true,
                }
            };
            if latch {
                self.store.schedules_mut()[index].last_fired = Some(stamp);
            }
        }
    }

    /// Dispatch due cues and retire finished slots
    fn trigger_sequences<S: CueSink>(
        &mut self,
        now_ms: u32,
        sink: &mut S,
        report: &mut TickReport,
    ) {
        for index in 0..MAX_RUNNING {
            let Some(slot) = self.pool.get_mut(index) else {
                continue;
            };
            let sequence_id = slot.sequence_id;

            let mut pending = false;
            if let Some(sequence) = self.store.sequence(sequence_id) {
                let elapsed = slot.elapsed_ms(now_ms);
                for (cue_index, cue) in sequence.cues().iter().enumerate() {
                    let offset = cue.offset_ms();
                    if slot.is_due(offset, now_ms) {
                        match sink.dispatch(cue) {
                            Ok(outcome) => report.push(SchedulerEvent::CueDispatched {
                                sequence_id,
                                cue_index,
                                outcome,
                            }),
                            Err(error) => report.push(SchedulerEvent::CueRejected {
                                sequence_id,
                                cue_index,
                                error,
                            }),
                        }
                    }
                    if offset > elapsed {
                        pending = true;
                    }
                }
            }
            slot.advance(now_ms);

            if !pending {
                self.pool.release(index);
                report.push(SchedulerEvent::SequenceFinished {
                    sequence_id,
                    slot: index,
                });
            }
        }
    }
}
