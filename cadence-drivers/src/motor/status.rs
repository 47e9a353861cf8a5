//! Motor controller status registers
//!
//! Bit layouts of the error, serial error and limit status variables, plus
//! the reset reason codes.

/// Error status variable (`ERROR_STATUS`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorStatus {
    pub safe_start_violation: bool,
    pub required_channel_invalid: bool,
    pub serial_error: bool,
    pub command_timeout: bool,
    /// Limit or kill switch active
    pub kill_switch: bool,
    pub low_vin: bool,
    pub high_vin: bool,
    pub over_temperature: bool,
    pub motor_driver_error: bool,
    pub err_line_high: bool,
}

impl ErrorStatus {
    pub fn from_register(value: u16) -> Self {
        Self {
            safe_start_violation: value & (1 << 0) != 0,
            required_channel_invalid: value & (1 << 1) != 0,
            serial_error: value & (1 << 2) != 0,
            command_timeout: value & (1 << 3) != 0,
            kill_switch: value & (1 << 4) != 0,
            low_vin: value & (1 << 5) != 0,
            high_vin: value & (1 << 6) != 0,
            over_temperature: value & (1 << 7) != 0,
            motor_driver_error: value & (1 << 8) != 0,
            err_line_high: value & (1 << 9) != 0,
        }
    }

    /// Any condition that stops the motor
    pub fn has_fault(&self) -> bool {
        self.required_channel_invalid
            || self.serial_error
            || self.command_timeout
            || self.kill_switch
            || self.low_vin
            || self.high_vin
            || self.over_temperature
            || self.motor_driver_error
    }
}

/// Serial error variable (`SERIAL_ERRORS`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialErrors {
    pub frame: bool,
    pub noise: bool,
    pub rx_overrun: bool,
    pub format: bool,
    pub crc: bool,
}

impl SerialErrors {
    pub fn from_register(value: u16) -> Self {
        Self {
            frame: value & (1 << 1) != 0,
            noise: value & (1 << 2) != 0,
            rx_overrun: value & (1 << 3) != 0,
            format: value & (1 << 4) != 0,
            crc: value & (1 << 5) != 0,
        }
    }
}

/// Limit status variable (`LIMIT_STATUS`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitStatus {
    /// Motor is not allowed to run (error or safe-start)
    pub safe_start: bool,
    /// Temperature is reducing target speed
    pub temperature: bool,
    /// Max speed limit is reducing target speed
    pub max_speed: bool,
    /// Starting speed limit is holding target speed at zero
    pub starting_speed: bool,
    /// Acceleration, deceleration or brake duration limits active
    pub acceleration: bool,
    pub rc1_kill: bool,
    pub rc2_kill: bool,
    pub an1_kill: bool,
    pub an2_kill: bool,
    pub usb_kill: bool,
}

impl LimitStatus {
    pub fn from_register(value: u16) -> Self {
        Self {
            safe_start: value & (1 << 0) != 0,
            temperature: value & (1 << 1) != 0,
            max_speed: value & (1 << 2) != 0,
            starting_speed: value & (1 << 3) != 0,
            acceleration: value & (1 << 4) != 0,
            rc1_kill: value & (1 << 5) != 0,
            rc2_kill: value & (1 << 6) != 0,
            an1_kill: value & (1 << 7) != 0,
            an2_kill: value & (1 << 8) != 0,
            usb_kill: value & (1 << 9) != 0,
        }
    }
}

/// Why the controller last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetReason {
    /// RST line pulled low
    ResetPin,
    #[default]
    PowerOn,
    Software,
    Watchdog,
    Unknown(u16),
}

impl ResetReason {
    pub fn from_register(value: u16) -> Self {
        match value {
            0x04 => ResetReason::ResetPin,
            0x0C => ResetReason::PowerOn,
            0x14 => ResetReason::Software,
            0x24 => ResetReason::Watchdog,
            other => ResetReason::Unknown(other),
        }
    }
}

/// Decoded status snapshot, replaced as a whole on every refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorStatus {
    pub errors: ErrorStatus,
    /// Error bits that have been set since the last read
    pub errors_occurred: u16,
    pub serial: SerialErrors,
    pub limits: LimitStatus,
    pub reset: ResetReason,
}
