//! Actuator traits
//!
//! One trait per output family. Implementations live in `cadence-drivers`;
//! tests use in-memory recorders.

/// Serial bus of motor controllers addressed by device id
pub trait MotorBus {
    /// Error type for bus operations
    type Error;

    /// Drive a motor at `percent` of full speed
    ///
    /// Implementations must apply their configured speed limit.
    fn set_motor(&mut self, device_id: u8, forward: bool, percent: u16) -> Result<(), Self::Error>;

    /// Emergency stop every address on the bus, known or not
    ///
    /// A failed address must not end the sweep early.
    fn estop_all(&mut self) -> Result<(), Self::Error>;

    /// Clear the safe-start latch on every registered controller
    fn safe_start_all(&mut self) -> Result<(), Self::Error>;
}

/// Bank of on/off relay outputs
pub trait RelayOutput {
    /// Error type for relay operations
    type Error;

    /// Number of switchable outputs
    fn channels(&self) -> u8;

    /// Switch output `index` (0-based) on or off
    fn set_relay(&mut self, index: u8, on: bool) -> Result<(), Self::Error>;
}

/// DMX512 channel levels
pub trait DmxOutput {
    /// Error type for DMX operations
    type Error;

    /// Number of slots including the start code slot
    ///
    /// Valid channels are `1..channels()`.
    fn channels(&self) -> u16;

    /// Set the level of `channel`
    fn set_level(&mut self, channel: u16, level: u8) -> Result<(), Self::Error>;
}
