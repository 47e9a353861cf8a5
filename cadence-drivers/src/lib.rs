//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the actuator traits
//! defined in cadence-core, built on the bus traits from cadence-hal:
//!
//! - Motor controllers on a shared serial link (Simple Motor Controller protocol)
//! - PCF8574 relay bank
//! - DMX512 universe buffer
//! - AT30TS750A board temperature sensor

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod dmx;
pub mod motor;
pub mod relay;
pub mod sensor;
