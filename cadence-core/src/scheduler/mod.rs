//! Sequences, schedules and their playback
//!
//! - [`store`]: sequence and schedule tables
//! - [`pool`]: slots tracking sequences in playback
//! - [`executor`]: the tick-driven scheduler tying both together
//! - [`persist`]: reading and writing shows in the record format

pub mod executor;
pub mod persist;
pub mod pool;
pub mod store;

pub use executor::{RunState, Scheduler, SchedulerEvent, TickReport, MAX_TICK_EVENTS};
pub use persist::{load_schedules, load_sequence, write_schedules, write_sequence, LoadError};
pub use pool::{RunningPool, RunningSlot, StartError};
pub use store::{Schedule, Sequence, SequenceStore, StoreError};
