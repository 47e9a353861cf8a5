//! Emergency stop latch
//!
//! Once tripped the latch stays engaged until explicitly reset. Every
//! dispatch path checks it before touching an output.

use crate::traits::DispatchError;

/// Emergency stop latch
#[derive(Debug, Clone, Default)]
pub struct Interlock {
    /// Latch engaged
    engaged: bool,
    /// Number of times the latch has been tripped since boot
    trips: u16,
}

impl Interlock {
    /// Create a released interlock
    pub const fn new() -> Self {
        Self {
            engaged: false,
            trips: 0,
        }
    }

    /// Engage the latch
    pub fn trip(&mut self) {
        if !self.engaged {
            self.trips = self.trips.saturating_add(1);
        }
        self.engaged = true;
    }

    /// Release the latch
    pub fn reset(&mut self) {
        self.engaged = false;
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn trip_count(&self) -> u16 {
        self.trips
    }

    /// Fail with [`DispatchError::SafetyViolation`] while engaged
    pub fn check(&self) -> Result<(), DispatchError> {
        if self.engaged {
            Err(DispatchError::SafetyViolation)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch() {
        let mut interlock = Interlock::new();
        assert!(interlock.check().is_ok());

        interlock.trip();
        interlock.trip();
        assert_eq!(interlock.check(), Err(DispatchError::SafetyViolation));
        assert_eq!(interlock.trip_count(), 1);

        interlock.reset();
        assert!(!interlock.is_engaged());
        assert!(interlock.check().is_ok());
    }
}
