//! RP2040-specific HAL for the show controller
//!
//! This crate provides RP2040 implementations of the shared `cadence-hal`
//! traits:
//!
//! - Flash storage driver (implements `cadence_hal::FlashStorage`)
//! - Deadline-bounded serial adapter over a buffered UART
//! - Shared I2C bus handle for the relay board and the board sensor

#![no_std]

pub mod flash;
pub mod i2c;
pub mod uart;

// Re-export shared traits from cadence-hal for convenience
pub use cadence_hal::{FlashStorage as FlashStorageTrait, StorageKey};
