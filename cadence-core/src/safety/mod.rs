//! Safety interlocks
//!
//! Gates every actuator command behind the emergency stop latch.

pub mod interlock;
pub mod switch;

pub use interlock::Interlock;
pub use switch::{EstopSwitch, SwitchEvent};
