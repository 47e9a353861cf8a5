//! Motor controller serial protocol
//!
//! Compact protocol frames addressed to a device on a shared bus:
//!
//! ```text
//! [0xAA][device id][opcode][args...][CRC7]
//! ```
//!
//! The CRC byte is only sent when CRC mode is enabled on the controllers.
//! Speed arguments are clamped by the [`Encoder`], so no command reaches the
//! wire above the configured limit.

/// Frame start byte
pub const SYNC: u8 = 0xAA;

/// CRC7 polynomial (bit reflected)
pub const CRC7_POLY: u8 = 0x91;

/// Longest frame: sync, device, opcode, two argument bytes, CRC
pub const MAX_FRAME_LEN: usize = 6;

/// Highest device id on the bus
pub const MAX_DEVICE_ID: u8 = 253;

/// Brake amount applied before an emergency stop
pub const ESTOP_BRAKE: u8 = 37;

/// Command opcodes
pub mod opcode {
    /// Clear the safe-start latch
    pub const EXIT_SAFE_START: u8 = 0x03;
    /// Drive forward
    pub const MOTOR_FORWARD: u8 = 0x05;
    /// Drive in reverse
    pub const MOTOR_REVERSE: u8 = 0x06;
    /// Brake with a given amount
    pub const MOTOR_BRAKE: u8 = 0x12;
    /// Read a 16-bit variable
    pub const GET_VARIABLE: u8 = 0x21;
    /// Read product id and firmware version
    pub const GET_FIRMWARE: u8 = 0x42;
    /// Stop and enter safe-start
    pub const STOP_MOTOR: u8 = 0x60;
}

/// Variable ids for [`opcode::GET_VARIABLE`]
pub mod var {
    pub const ERROR_STATUS: u8 = 0;
    pub const ERRORS_OCCURRED: u8 = 1;
    pub const SERIAL_ERRORS: u8 = 2;
    pub const LIMIT_STATUS: u8 = 3;
    pub const SPEED: u8 = 21;
    pub const BRAKE_AMOUNT: u8 = 22;
    pub const INPUT_VOLTAGE: u8 = 23;
    pub const TEMPERATURE: u8 = 24;
    pub const BAUD_RATE: u8 = 27;
    /// Uptime, low word
    pub const UPTIME_LOW: u8 = 28;
    /// Uptime, high word
    pub const UPTIME_HIGH: u8 = 29;
    pub const RESET_FLAGS: u8 = 127;
}

/// CRC7 over a message, as the controllers compute it
pub fn crc7(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc ^= CRC7_POLY;
            }
            crc >>= 1;
        }
    }
    crc
}

/// A command to one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Allow the motor to run after a stop or error
    ExitSafeStart,
    /// Drive at `percent` of full speed
    Speed { forward: bool, percent: u16 },
    /// Brake, 0 is coast and 32 full brake
    Brake(u8),
    /// Read a variable, reply is two bytes little-endian
    GetVariable(u8),
    /// Read firmware, reply is four bytes
    GetFirmware,
    /// Stop the motor and latch safe-start
    Stop,
}

impl Command {
    pub fn opcode(&self) -> u8 {
        match self {
            Command::ExitSafeStart => opcode::EXIT_SAFE_START,
            Command::Speed { forward: true, .. } => opcode::MOTOR_FORWARD,
            Command::Speed { forward: false, .. } => opcode::MOTOR_REVERSE,
            Command::Brake(_) => opcode::MOTOR_BRAKE,
            Command::GetVariable(_) => opcode::GET_VARIABLE,
            Command::GetFirmware => opcode::GET_FIRMWARE,
            Command::Stop => opcode::STOP_MOTOR,
        }
    }

    /// Number of reply bytes the controller sends back
    pub fn reply_len(&self) -> usize {
        match self {
            Command::GetVariable(_) => 2,
            Command::GetFirmware => 4,
            _ => 0,
        }
    }
}

/// An encoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    fn new(device_id: u8, opcode: u8) -> Self {
        let mut bytes = [0u8; MAX_FRAME_LEN];
        bytes[0] = SYNC;
        bytes[1] = device_id;
        bytes[2] = opcode;
        Self { bytes, len: 3 }
    }

    fn push(&mut self, byte: u8) {
        if self.len < MAX_FRAME_LEN {
            self.bytes[self.len] = byte;
            self.len += 1;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Frame encoder carrying the link-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    /// Speed ceiling applied to every speed command
    pub max_speed_percent: u8,
    /// Append a CRC7 byte
    pub crc_enabled: bool,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            max_speed_percent: 100,
            crc_enabled: false,
        }
    }
}

impl Encoder {
    pub fn encode(&self, device_id: u8, command: &Command) -> Frame {
        let mut frame = Frame::new(device_id, command.opcode());
        match *command {
            Command::Speed { percent, .. } => {
                let clamped = percent.min(self.max_speed_percent as u16) as u8;
                frame.push(0x00);
                frame.push(clamped);
            }
            Command::Brake(amount) => frame.push(amount),
            Command::GetVariable(id) => frame.push(id),
            Command::ExitSafeStart | Command::GetFirmware | Command::Stop => {}
        }
        if self.crc_enabled {
            let crc = crc7(frame.as_bytes());
            frame.push(crc);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc7_reference() {
        assert_eq!(crc7(&[0x83, 0x01]), 0x17);
        assert_eq!(crc7(&[0xAA, 0x01, 0x05, 0x00, 0x32]), 0x3C);
        assert_eq!(crc7(&[]), 0);
    }

    #[test]
    fn test_speed_frame() {
        let enc = Encoder::default();
        let frame = enc.encode(
            1,
            &Command::Speed {
                forward: true,
                percent: 50,
            },
        );
        assert_eq!(frame.as_bytes(), &[0xAA, 0x01, 0x05, 0x00, 0x32]);

        let frame = enc.encode(
            2,
            &Command::Speed {
                forward: false,
                percent: 10,
            },
        );
        assert_eq!(frame.as_bytes(), &[0xAA, 0x02, 0x06, 0x00, 0x0A]);
    }

    #[test]
    fn test_speed_is_clamped() {
        let enc = Encoder::default();
        let frame = enc.encode(
            1,
            &Command::Speed {
                forward: true,
                percent: 150,
            },
        );
        assert_eq!(frame.as_bytes()[4], 100);

        let enc = Encoder {
            max_speed_percent: 40,
            crc_enabled: false,
        };
        let frame = enc.encode(
            1,
            &Command::Speed {
                forward: true,
                percent: 999,
            },
        );
        assert_eq!(frame.as_bytes()[4], 40);
    }

    #[test]
    fn test_crc_appended() {
        let enc = Encoder {
            max_speed_percent: 100,
            crc_enabled: true,
        };
        let frame = enc.encode(
            1,
            &Command::Speed {
                forward: true,
                percent: 50,
            },
        );
        assert_eq!(frame.as_bytes(), &[0xAA, 0x01, 0x05, 0x00, 0x32, 0x3C]);
    }

    #[test]
    fn test_short_frames() {
        let enc = Encoder::default();
        assert_eq!(
            enc.encode(7, &Command::ExitSafeStart).as_bytes(),
            &[0xAA, 0x07, 0x03]
        );
        assert_eq!(
            enc.encode(7, &Command::Brake(ESTOP_BRAKE)).as_bytes(),
            &[0xAA, 0x07, 0x12, 37]
        );
        assert_eq!(
            enc.encode(7, &Command::GetVariable(var::SPEED)).as_bytes(),
            &[0xAA, 0x07, 0x21, 21]
        );
        assert_eq!(enc.encode(7, &Command::Stop).as_bytes(), &[0xAA, 0x07, 0x60]);
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(dev in 0u8..=MAX_DEVICE_ID, percent in 0u16..1000, crc: bool) {
            let enc = Encoder { max_speed_percent: 100, crc_enabled: crc };
            let cmd = Command::Speed { forward: true, percent };
            let a = enc.encode(dev, &cmd);
            let b = enc.encode(dev, &cmd);
            prop_assert_eq!(a, b);
            prop_assert!(a.as_bytes()[4] <= 100);
            if crc {
                let bytes = a.as_bytes();
                prop_assert_eq!(bytes[5], crc7(&bytes[..5]));
            }
        }
    }
}
