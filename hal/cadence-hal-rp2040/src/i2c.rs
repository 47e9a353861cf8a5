//! Shared I2C bus
//!
//! The relay expander and the board temperature sensor sit on the same
//! I2C0 bus but are driven from different tasks. The bus lives in a
//! blocking mutex and each driver gets a cheap [`SharedI2c`] handle that
//! locks it for the length of one transaction.

use core::cell::RefCell;

use cadence_hal::i2c::{I2cBus, I2cConfig};
use embassy_rp::i2c;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::i2c::I2c;

/// Bus owned by a static mutex
pub type I2cMutex<T> = Mutex<CriticalSectionRawMutex, RefCell<T>>;

/// Map a HAL bus configuration onto the embassy I2C config
pub fn i2c_config(config: &I2cConfig) -> i2c::Config {
    let mut out = i2c::Config::default();
    out.frequency = config.frequency;
    out
}

/// Handle to an I2C bus shared between drivers
pub struct SharedI2c<'a, T> {
    bus: &'a I2cMutex<T>,
}

impl<'a, T> SharedI2c<'a, T> {
    pub fn new(bus: &'a I2cMutex<T>) -> Self {
        Self { bus }
    }
}

impl<'a, T> Clone for SharedI2c<'a, T> {
    fn clone(&self) -> Self {
        Self { bus: self.bus }
    }
}

impl<'a, T: I2c> I2cBus for SharedI2c<'a, T> {
    type Error = T::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock(|bus| bus.borrow_mut().write(address, data))
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock(|bus| bus.borrow_mut().read(address, buf))
    }
}
