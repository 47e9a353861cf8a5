//! Actuator and dispatch traits
//!
//! These traits define the interface between the scheduling logic and the
//! hardware-specific output implementations.

pub mod actuator;
pub mod sink;

pub use actuator::{DmxOutput, MotorBus, RelayOutput};
pub use sink::{CueSink, DeviceKind, DispatchError, DispatchOutcome};
