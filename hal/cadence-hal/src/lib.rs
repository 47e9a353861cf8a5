//! Cadence Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits that the drivers in
//! `cadence-drivers` are written against. Chip-specific crates implement
//! them, and host tests implement them with in-memory mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Drivers (cadence-drivers)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cadence-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ cadence-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication with bounded reads
//! - [`i2c::I2cBus`] - I2C bus operations
//! - [`flash::FlashStorage`] - Persistent storage

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod i2c;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use flash::{FlashError, FlashStorage, StorageKey};
pub use i2c::I2cBus;
pub use uart::{Uart, UartRx, UartTx};
