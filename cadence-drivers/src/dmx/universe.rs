//! DMX512 universe buffer
//!
//! Holds the level of every slot and hands out the frame to transmit. Slot
//! 0 is the start code and is always zero for dimmer data; addressable
//! channels start at 1. The transmitter resends the whole frame on a fixed
//! period, so setting a level only touches the buffer.

use cadence_core::traits::DmxOutput;

/// Slots in a full universe, start code included
pub const DMX_SLOTS: usize = 513;

/// Null start code for dimmer data
pub const START_CODE: u8 = 0x00;

/// DMX errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxError {
    /// Channel is 0 or beyond the configured universe size
    ChannelOutOfRange,
}

/// Universe buffer
#[derive(Debug, Clone)]
pub struct DmxUniverse {
    slots: [u8; DMX_SLOTS],
    len: u16,
    dirty: bool,
}

impl DmxUniverse {
    /// Create a universe of `slots` slots, start code included
    ///
    /// Sizes are clamped to 2..=513.
    pub fn new(slots: u16) -> Self {
        let len = slots.clamp(2, DMX_SLOTS as u16);
        let mut buf = [0u8; DMX_SLOTS];
        buf[0] = START_CODE;
        Self {
            slots: buf,
            len,
            dirty: true,
        }
    }

    pub fn level(&self, channel: u16) -> Option<u8> {
        if channel == 0 || channel >= self.len {
            return None;
        }
        Some(self.slots[channel as usize])
    }

    /// Set every channel to zero
    pub fn blackout(&mut self) {
        self.slots[1..].fill(0);
        self.dirty = true;
    }

    /// The frame to transmit after the break, start code first
    pub fn frame(&self) -> &[u8] {
        &self.slots[..self.len as usize]
    }

    /// Whether any level changed since the last call
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}

impl DmxOutput for DmxUniverse {
    type Error = DmxError;

    fn channels(&self) -> u16 {
        self.len
    }

    fn set_level(&mut self, channel: u16, level: u8) -> Result<(), DmxError> {
        if channel == 0 || channel >= self.len {
            return Err(DmxError::ChannelOutOfRange);
        }
        let slot = &mut self.slots[channel as usize];
        if *slot != level {
            *slot = level;
            self.dirty = true;
        }
        Ok(())
    }
}
