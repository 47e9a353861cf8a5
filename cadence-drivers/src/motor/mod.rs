//! Motor controllers on a shared serial bus
//!
//! - [`protocol`]: frame encoding and CRC7
//! - [`status`]: status register decoding
//! - [`link`]: the bus itself with its device registry

pub mod link;
pub mod protocol;
pub mod status;

pub use link::{Firmware, LinkError, MotorController, MotorLink, POLL_TIMEOUT_MS};
pub use protocol::{crc7, Command, Encoder, Frame};
pub use status::{ErrorStatus, LimitStatus, MotorStatus, ResetReason, SerialErrors};
