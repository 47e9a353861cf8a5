//! Cue dispatch to the actuator outputs

pub mod system;

pub use system::SystemControl;
