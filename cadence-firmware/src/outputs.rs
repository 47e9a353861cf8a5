//! Actuator outputs shared between tasks
//!
//! The controller writes DMX levels while the DMX task streams the frame
//! out, so the universe lives behind a blocking mutex and the controller
//! sees it through [`SharedDmx`].

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use cadence_core::traits::DmxOutput;
use cadence_drivers::dmx::{DmxError, DmxUniverse};

/// Universe owned by a static mutex
pub type SharedUniverse = Mutex<CriticalSectionRawMutex, RefCell<DmxUniverse>>;

/// Controller-side handle to the shared universe
pub struct SharedDmx {
    universe: &'static SharedUniverse,
    channels: u16,
}

impl SharedDmx {
    pub fn new(universe: &'static SharedUniverse) -> Self {
        let channels = universe.lock(|u| u.borrow().channels());
        Self { universe, channels }
    }
}

impl DmxOutput for SharedDmx {
    type Error = DmxError;

    fn channels(&self) -> u16 {
        self.channels
    }

    fn set_level(&mut self, channel: u16, level: u8) -> Result<(), DmxError> {
        self.universe
            .lock(|u| u.borrow_mut().set_level(channel, level))
    }
}
