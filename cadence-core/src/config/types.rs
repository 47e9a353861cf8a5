//! Configuration type definitions
//!
//! These types represent the controller configuration. Configuration is
//! stored in flash as postcard-serialized binary data, and the firmware
//! falls back to the defaults here when nothing valid is stored.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration layout version
pub const CONFIG_VERSION: u8 = 1;

/// Maximum stored sequences
pub const MAX_SEQUENCES: usize = 20;

/// Maximum cues per sequence
pub const MAX_CUES: usize = 48;

/// Maximum stored schedules
pub const MAX_SCHEDULES: usize = 128;

/// Maximum concurrently running sequences
pub const MAX_RUNNING: usize = 5;

/// Maximum registered motor controllers
pub const MAX_MOTORS: usize = 12;

/// Motor controller serial link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorLinkConfig {
    /// Serial baud rate
    pub baud_rate: u32,
    /// Speed limiter applied to every motor command (percent)
    pub max_speed_percent: u8,
    /// Append CRC7 to every outgoing frame
    pub crc_enabled: bool,
    /// Upper bound on any reply wait (ms)
    pub read_timeout_ms: u32,
}

impl Default for MotorLinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            max_speed_percent: 100,
            crc_enabled: false,
            read_timeout_ms: 100,
        }
    }
}

/// Relay bank settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelayConfig {
    /// 7-bit I2C address of the port expander
    pub i2c_address: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { i2c_address: 0x38 }
    }
}

/// DMX output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DmxConfig {
    /// Universe size in slots, start code included
    ///
    /// Channels `1..channels` are addressable.
    pub channels: u16,
    /// Universe refresh period (ms)
    pub refresh_interval_ms: u32,
}

impl Default for DmxConfig {
    fn default() -> Self {
        Self {
            channels: 128,
            refresh_interval_ms: 25,
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedulerConfig {
    /// Tick period (ms)
    pub tick_interval_ms: u32,
    /// Start evaluating schedules immediately after boot
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            autostart: true,
        }
    }
}

/// Wall clock settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockConfig {
    /// Seconds since the Unix epoch loaded into a stopped RTC at boot
    pub boot_epoch_s: i64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        // 2024-01-01T00:00:00
        Self {
            boot_epoch_s: 1_704_067_200,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemConfig {
    /// Layout version, must equal [`CONFIG_VERSION`]
    pub version: u8,
    pub motor: MotorLinkConfig,
    pub relay: RelayConfig,
    pub dmx: DmxConfig,
    pub scheduler: SchedulerConfig,
    pub clock: ClockConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            motor: MotorLinkConfig::default(),
            relay: RelayConfig::default(),
            dmx: DmxConfig::default(),
            scheduler: SchedulerConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}
