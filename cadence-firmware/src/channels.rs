//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Channel capacity for control requests
const CONTROL_CHANNEL_SIZE: usize = 4;

/// Requests handled by the controller between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest {
    /// Emergency stop: abort every sequence and halt all motors
    Estop,
    /// Release the emergency stop
    Restart,
}

/// Control requests from the estop input (and any future control surface)
pub static CONTROL_CHANNEL: Channel<CriticalSectionRawMutex, ControlRequest, CONTROL_CHANNEL_SIZE> =
    Channel::new();

