//! Relay outputs

pub mod pcf8574;

pub use pcf8574::{Pcf8574Relays, RelayError};
