//! PCF8574 relay bank
//!
//! Eight quasi-bidirectional outputs on an I2C port expander. The relay
//! boards sink current through the expander, so a low pin means the relay
//! is energized. The expander powers up with every pin high, which keeps
//! all relays off until the first write.

use cadence_core::traits::RelayOutput;
use cadence_hal::I2cBus;

/// Default address with A0..A2 tied low (PCF8574A)
pub const DEFAULT_ADDRESS: u8 = 0x38;

/// Output pins on the expander
pub const PINS: u8 = 8;

/// Latch value with every relay released
const ALL_OFF: u8 = 0xFF;

/// Relay bank errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayError {
    /// Expander did not acknowledge
    Bus,
    /// Pin index out of range
    Channel,
}

/// Relay bank behind a PCF8574
pub struct Pcf8574Relays<B> {
    bus: B,
    address: u8,
    latch: u8,
}

impl<B: I2cBus> Pcf8574Relays<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            latch: ALL_OFF,
        }
    }

    /// Release every relay
    pub fn all_off(&mut self) -> Result<(), RelayError> {
        self.latch = ALL_OFF;
        self.flush()
    }

    /// Whether relay `index` is currently energized
    pub fn is_on(&self, index: u8) -> bool {
        index < PINS && self.latch & (1 << index) == 0
    }

    /// Raw output latch, bit set means released
    pub fn latch(&self) -> u8 {
        self.latch
    }

    fn flush(&mut self) -> Result<(), RelayError> {
        self.bus
            .write(self.address, &[self.latch])
            .map_err(|_| RelayError::Bus)
    }
}

impl<B: I2cBus> RelayOutput for Pcf8574Relays<B> {
    type Error = RelayError;

    fn channels(&self) -> u8 {
        PINS
    }

    fn set_relay(&mut self, index: u8, on: bool) -> Result<(), RelayError> {
        if index >= PINS {
            return Err(RelayError::Channel);
        }
        if on {
            self.latch &= !(1 << index);
        } else {
            self.latch |= 1 << index;
        }
        self.flush()
    }
}
