//! Cue dispatch seam between the scheduler and the outputs

use cadence_protocol::Cue;

/// Output family a dispatch failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceKind {
    Motor,
    Relay,
    Dmx,
}

/// Cue dispatch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// Emergency stop is engaged, nothing may move
    SafetyViolation,
    /// The output device reported a failure
    Device(DeviceKind),
}

/// Result of a dispatch that was allowed through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// Command was sent to an output
    Sent,
    /// Cue targets nothing addressable (unknown type, out of range device)
    Ignored,
}

/// Receiver of due cues
pub trait CueSink {
    fn dispatch(&mut self, cue: &Cue) -> Result<DispatchOutcome, DispatchError>;
}
