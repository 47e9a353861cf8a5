//! Emergency stop switch tracking
//!
//! A press is acted on at the first edge, before any debounce, so the
//! stop request never waits behind a settle delay. A release only counts
//! once the input has settled, so contact bounce cannot restart the show.

/// Change reported by the switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchEvent {
    Pressed,
    Released,
}

/// Debounced state of the estop switch
#[derive(Debug, Clone, Copy)]
pub struct EstopSwitch {
    engaged: bool,
}

impl EstopSwitch {
    /// Start from the level read at boot
    pub const fn new(pressed: bool) -> Self {
        Self { engaged: pressed }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// The input just went to its pressed level
    ///
    /// Reports a press immediately unless one is already latched.
    pub fn press_edge(&mut self) -> Option<SwitchEvent> {
        if self.engaged {
            return None;
        }
        self.engaged = true;
        Some(SwitchEvent::Pressed)
    }

    /// Level read after the settle time that follows any edge
    pub fn settled(&mut self, pressed: bool) -> Option<SwitchEvent> {
        if pressed == self.engaged {
            return None;
        }
        self.engaged = pressed;
        Some(if pressed {
            SwitchEvent::Pressed
        } else {
            SwitchEvent::Released
        })
    }
}
