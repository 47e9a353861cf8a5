//! Board sensors and I2C housekeeping

pub mod at30ts750;

pub use at30ts750::{At30ts750, SensorError};

use cadence_hal::I2cBus;
use heapless::Vec;

/// Addresses probed by [`scan`]
pub const SCAN_RANGE: core::ops::Range<u8> = 1..127;

/// List every address on the bus that acknowledges
pub fn scan<B: I2cBus>(bus: &mut B) -> Vec<u8, 128> {
    let mut found = Vec::new();
    for address in SCAN_RANGE {
        if bus.probe(address) {
            // At most 126 addresses are probed
            let _ = found.push(address);
        }
    }
    found
}
