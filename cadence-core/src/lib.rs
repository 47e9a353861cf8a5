//! Board-agnostic core logic for the show controller firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Actuator traits (motor bus, relay bank, DMX universe)
//! - Sequence and schedule storage
//! - Running sequence pool and the tick-driven scheduler
//! - Cue dispatch with the emergency stop interlock
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
pub mod control;
pub mod safety;
pub mod scheduler;
pub mod traits;
