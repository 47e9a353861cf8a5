//! Serial link to a bus of motor controllers
//!
//! Owns the UART and a registry of known controllers. Every read is bounded
//! by a timeout; a controller that stays silent degrades the call that
//! asked but is never removed from the registry.

use heapless::Vec;

use cadence_core::config::{MotorLinkConfig, MAX_MOTORS};
use cadence_core::traits::MotorBus;
use cadence_hal::Uart;

use super::protocol::{var, Command, Encoder, ESTOP_BRAKE, MAX_DEVICE_ID};
use super::status::{ErrorStatus, LimitStatus, MotorStatus, ResetReason, SerialErrors};

/// Presence probe timeout
pub const POLL_TIMEOUT_MS: u32 = 100;

/// Stale bytes discarded before a request
const MAX_DRAIN: usize = 16;

/// Motor link errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Controller did not answer in time
    Timeout,
    /// UART reported an error
    Serial,
    /// Device id is not registered
    NotFound,
    /// Registry is full
    Capacity,
}

/// Product id and firmware version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Firmware {
    pub product_id: u16,
    pub minor: u8,
    pub major: u8,
}

/// Last known state of one controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorController {
    pub device_id: u8,
    pub firmware: Firmware,
    /// Current speed, -3200..=3200 as reported
    pub speed: i16,
    pub brake_amount: u16,
    /// Input voltage in mV
    pub input_voltage_mv: u16,
    /// Board temperature in 0.1 °C
    pub temperature_x10: u16,
    /// Baud rate register as reported
    pub baud_rate: u16,
    pub uptime_ms: u32,
    pub status: MotorStatus,
}

impl MotorController {
    fn new(device_id: u8) -> Self {
        Self {
            device_id,
            ..Default::default()
        }
    }
}

/// Motor controller bus
pub struct MotorLink<U> {
    uart: U,
    encoder: Encoder,
    read_timeout_ms: u32,
    motors: Vec<MotorController, MAX_MOTORS>,
}

impl<U: Uart> MotorLink<U> {
    pub fn new(uart: U, config: &MotorLinkConfig) -> Self {
        Self {
            uart,
            encoder: Encoder {
                max_speed_percent: config.max_speed_percent,
                crc_enabled: config.crc_enabled,
            },
            read_timeout_ms: config.read_timeout_ms,
            motors: Vec::new(),
        }
    }

    fn send(&mut self, device_id: u8, command: &Command) -> Result<(), LinkError> {
        let frame = self.encoder.encode(device_id, command);
        self.uart
            .write_blocking(frame.as_bytes())
            .map_err(|_| LinkError::Serial)?;
        self.uart.flush().map_err(|_| LinkError::Serial)
    }

    /// Send a command and read its fixed-size reply
    fn request(
        &mut self,
        device_id: u8,
        command: &Command,
        reply: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize, LinkError> {
        for _ in 0..MAX_DRAIN {
            match self.uart.read_byte(0) {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => return Err(LinkError::Serial),
            }
        }
        self.send(device_id, command)?;
        self.uart
            .read_timeout(reply, timeout_ms)
            .map_err(|_| LinkError::Serial)
    }

    /// Clear the safe-start latch so the motor may run
    pub fn disable_safe_start(&mut self, device_id: u8) -> Result<(), LinkError> {
        self.send(device_id, &Command::ExitSafeStart)
    }

    /// Drive a motor, speed is capped at the configured maximum
    pub fn set_motor(&mut self, device_id: u8, forward: bool, percent: u16) -> Result<(), LinkError> {
        self.send(device_id, &Command::Speed { forward, percent })
    }

    pub fn brake_motor(&mut self, device_id: u8, amount: u8) -> Result<(), LinkError> {
        self.send(device_id, &Command::Brake(amount))
    }

    /// Brake then stop a motor
    ///
    /// The controller latches safe-start; [`disable_safe_start`](Self::disable_safe_start)
    /// is needed before it runs again.
    ///
    /// The stop is sent even when the brake command fails.
    pub fn estop_motor(&mut self, device_id: u8) -> Result<(), LinkError> {
        let braked = self.brake_motor(device_id, ESTOP_BRAKE);
        self.send(device_id, &Command::Stop)?;
        braked
    }

    /// Read a 16-bit variable
    pub fn get_variable(&mut self, device_id: u8, variable: u8) -> Result<u16, LinkError> {
        let mut reply = [0u8; 2];
        let timeout = self.read_timeout_ms;
        let n = self.request(device_id, &Command::GetVariable(variable), &mut reply, timeout)?;
        if n < reply.len() {
            return Err(LinkError::Timeout);
        }
        Ok(u16::from_le_bytes(reply))
    }

    /// Read a variable, treating a silent controller as zero
    pub fn get_variable_or_zero(&mut self, device_id: u8, variable: u8) -> u16 {
        self.get_variable(device_id, variable).unwrap_or(0)
    }

    /// Read product id and firmware version
    pub fn get_firmware(&mut self, device_id: u8) -> Result<Firmware, LinkError> {
        let mut reply = [0u8; 4];
        let timeout = self.read_timeout_ms;
        let n = self.request(device_id, &Command::GetFirmware, &mut reply, timeout)?;
        if n < reply.len() {
            return Err(LinkError::Timeout);
        }
        Ok(Firmware {
            product_id: u16::from_le_bytes([reply[0], reply[1]]),
            minor: reply[2],
            major: reply[3],
        })
    }

    /// Whether anything answers at `device_id`
    pub fn poll_motor(&mut self, device_id: u8) -> bool {
        let mut reply = [0u8; 4];
        matches!(
            self.request(device_id, &Command::GetFirmware, &mut reply, POLL_TIMEOUT_MS),
            Ok(n) if n > 0
        )
    }

    /// Re-read firmware and telemetry of a registered controller
    ///
    /// Returns `Ok(false)` when the controller did not answer the probe; its
    /// previous snapshot is kept in that case.
    pub fn refresh_motor(&mut self, device_id: u8) -> Result<bool, LinkError> {
        let previous = self.get_motor(device_id).copied().ok_or(LinkError::NotFound)?;
        if !self.poll_motor(device_id) {
            return Ok(false);
        }

        let firmware = match self.get_firmware(device_id) {
            Ok(firmware) => firmware,
            Err(LinkError::Timeout) => previous.firmware,
            Err(e) => return Err(e),
        };
        let mut read = |variable| self.get_variable_or_zero(device_id, variable);
        let speed = read(var::SPEED) as i16;
        let brake_amount = read(var::BRAKE_AMOUNT);
        let input_voltage_mv = read(var::INPUT_VOLTAGE);
        let temperature_x10 = read(var::TEMPERATURE);
        let baud_rate = read(var::BAUD_RATE);
        let uptime_low = read(var::UPTIME_LOW) as u32;
        let uptime_high = read(var::UPTIME_HIGH) as u32;
        let status = MotorStatus {
            errors: ErrorStatus::from_register(read(var::ERROR_STATUS)),
            serial: SerialErrors::from_register(read(var::SERIAL_ERRORS)),
            errors_occurred: read(var::ERRORS_OCCURRED),
            limits: LimitStatus::from_register(read(var::LIMIT_STATUS)),
            reset: ResetReason::from_register(read(var::RESET_FLAGS)),
        };

        let snapshot = MotorController {
            device_id,
            firmware,
            speed,
            brake_amount,
            input_voltage_mv,
            temperature_x10,
            baud_rate,
            uptime_ms: uptime_low | (uptime_high << 16),
            status,
        };
        if let Some(entry) = self.motors.iter_mut().find(|m| m.device_id == device_id) {
            *entry = snapshot;
        }
        Ok(true)
    }

    /// Register a controller, read its state and let it run
    ///
    /// Adding a device that is already registered does nothing.
    pub fn add_motor(&mut self, device_id: u8) -> Result<(), LinkError> {
        if self.get_motor(device_id).is_some() {
            return Ok(());
        }
        self.motors
            .push(MotorController::new(device_id))
            .map_err(|_| LinkError::Capacity)?;
        self.refresh_motor(device_id)?;
        self.disable_safe_start(device_id)
    }

    pub fn get_motor(&self, device_id: u8) -> Option<&MotorController> {
        self.motors.iter().find(|m| m.device_id == device_id)
    }

    /// Registered controllers in registration order
    pub fn motors(&self) -> &[MotorController] {
        &self.motors
    }

    /// Refresh every registered controller
    ///
    /// Returns how many answered. A failing controller does not stop the
    /// others from being refreshed; the first error is returned at the end.
    pub fn refresh_all_motors(&mut self) -> Result<usize, LinkError> {
        let mut answered = 0;
        let mut first_error = None;
        for index in 0..self.motors.len() {
            let device_id = self.motors[index].device_id;
            match self.refresh_motor(device_id) {
                Ok(true) => answered += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(answered), Err)
    }

    /// Stop every address on the bus, registered or not
    ///
    /// Every address is tried even after a write fails; the first error is
    /// returned once the sweep is complete.
    pub fn estop_all_motors(&mut self) -> Result<(), LinkError> {
        let mut first_error = None;
        for device_id in 0..=MAX_DEVICE_ID {
            if let Err(e) = self.estop_motor(device_id) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Clear safe-start on every registered controller
    ///
    /// Continues past a failing controller and returns the first error.
    pub fn safe_start_all_motors(&mut self) -> Result<(), LinkError> {
        let mut first_error = None;
        for index in 0..self.motors.len() {
            let device_id = self.motors[index].device_id;
            if let Err(e) = self.disable_safe_start(device_id) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Release the UART
    pub fn release(self) -> U {
        self.uart
    }
}

impl<U: Uart> MotorBus for MotorLink<U> {
    type Error = LinkError;

    fn set_motor(&mut self, device_id: u8, forward: bool, percent: u16) -> Result<(), LinkError> {
        MotorLink::set_motor(self, device_id, forward, percent)
    }

    fn estop_all(&mut self) -> Result<(), LinkError> {
        self.estop_all_motors()
    }

    fn safe_start_all(&mut self) -> Result<(), LinkError> {
        self.safe_start_all_motors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::protocol::opcode;
    use cadence_hal::{UartRx, UartTx};
    use std::collections::{BTreeMap, VecDeque};
    use std::vec::Vec as StdVec;

    /// Simulated bus with a single controller answering at `device_id`
    #[derive(Default)]
    struct SimBus {
        device_id: u8,
        present: bool,
        firmware: [u8; 4],
        variables: BTreeMap<u8, u16>,
        /// Answer only this many bytes of each reply
        truncate: Option<usize>,
        /// Writes addressed to this device fail
        broken_device: Option<u8>,
        written: StdVec<StdVec<u8>>,
        rx: VecDeque<u8>,
    }

    impl SimBus {
        fn with_controller(device_id: u8) -> Self {
            Self {
                device_id,
                present: true,
                firmware: [0x9B, 0x00, 0x05, 0x01],
                ..Default::default()
            }
        }

        fn answer(&mut self, reply: &[u8]) {
            let n = self.truncate.unwrap_or(reply.len()).min(reply.len());
            self.rx.extend(&reply[..n]);
        }

        fn opcodes_to(&self, device_id: u8) -> StdVec<u8> {
            self.written
                .iter()
                .filter(|f| f[1] == device_id)
                .map(|f| f[2])
                .collect()
        }
    }

    impl UartTx for SimBus {
        type Error = ();

        fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
            if self.broken_device == Some(data[1]) {
                return Err(());
            }
            self.written.push(data.to_vec());
            if !self.present || data[1] != self.device_id {
                return Ok(());
            }
            match data[2] {
                opcode::GET_FIRMWARE => {
                    let fw = self.firmware;
                    self.answer(&fw);
                }
                opcode::GET_VARIABLE => {
                    let value = self.variables.get(&data[3]).copied().unwrap_or(0);
                    self.answer(&value.to_le_bytes());
                }
                _ => {}
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    impl UartRx for SimBus {
        type Error = ();

        fn read_timeout(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, ()> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    fn link(bus: SimBus) -> MotorLink<SimBus> {
        MotorLink::new(bus, &MotorLinkConfig::default())
    }

    #[test]
    fn test_set_motor_clamps() {
        let mut link = link(SimBus::default());
        link.set_motor(1, true, 150).unwrap();
        assert_eq!(link.uart.written[0], [0xAA, 0x01, 0x05, 0x00, 100]);
    }

    #[test]
    fn test_estop_motor_brakes_then_stops() {
        let mut link = link(SimBus::default());
        link.estop_motor(4).unwrap();
        assert_eq!(link.uart.written[0], [0xAA, 0x04, 0x12, 37]);
        assert_eq!(link.uart.written[1], [0xAA, 0x04, 0x60]);
    }

    #[test]
    fn test_get_variable() {
        let mut bus = SimBus::with_controller(3);
        bus.variables.insert(var::INPUT_VOLTAGE, 12_150);
        let mut link = link(bus);
        assert_eq!(link.get_variable(3, var::INPUT_VOLTAGE), Ok(12_150));
        assert_eq!(link.get_variable(9, var::INPUT_VOLTAGE), Err(LinkError::Timeout));
        assert_eq!(link.get_variable_or_zero(9, var::INPUT_VOLTAGE), 0);
    }

    #[test]
    fn test_short_reply_is_timeout() {
        let mut bus = SimBus::with_controller(3);
        bus.truncate = Some(1);
        let mut link = link(bus);
        assert_eq!(link.get_variable(3, var::SPEED), Err(LinkError::Timeout));
        assert_eq!(link.get_firmware(3), Err(LinkError::Timeout));
        // A partial answer still proves presence
        assert!(link.poll_motor(3));
    }

    #[test]
    fn test_firmware_reply_layout() {
        let mut link = link(SimBus::with_controller(3));
        let fw = link.get_firmware(3).unwrap();
        assert_eq!(fw.product_id, 0x009B);
        assert_eq!(fw.minor, 5);
        assert_eq!(fw.major, 1);
    }

    #[test]
    fn test_poll_absent_motor() {
        let mut link = link(SimBus::with_controller(3));
        assert!(link.poll_motor(3));
        assert!(!link.poll_motor(4));
    }

    #[test]
    fn test_add_motor_refreshes_and_enables() {
        let mut bus = SimBus::with_controller(3);
        bus.variables.insert(var::TEMPERATURE, 315);
        bus.variables.insert(var::UPTIME_LOW, 0x0010);
        bus.variables.insert(var::UPTIME_HIGH, 0x0002);
        bus.variables.insert(var::ERROR_STATUS, 1 << 5);
        bus.variables.insert(var::LIMIT_STATUS, 1);
        bus.variables.insert(var::RESET_FLAGS, 0x24);
        let mut link = link(bus);

        link.add_motor(3).unwrap();
        let motor = link.get_motor(3).unwrap();
        assert_eq!(motor.temperature_x10, 315);
        assert_eq!(motor.uptime_ms, 0x0002_0010);
        assert!(motor.status.errors.low_vin);
        assert!(motor.status.limits.safe_start);
        assert_eq!(motor.status.reset, ResetReason::Watchdog);
        assert_eq!(motor.firmware.major, 1);

        // Safe-start cleared last
        let ops = link.uart.opcodes_to(3);
        assert_eq!(ops.last(), Some(&opcode::EXIT_SAFE_START));

        // Duplicate add is a no-op
        let sent = link.uart.written.len();
        link.add_motor(3).unwrap();
        assert_eq!(link.uart.written.len(), sent);
        assert_eq!(link.motors().len(), 1);
    }

    #[test]
    fn test_absent_motor_stays_registered() {
        let mut link = link(SimBus::with_controller(3));
        link.add_motor(8).unwrap();
        assert!(link.get_motor(8).is_some());
        assert_eq!(link.refresh_motor(8), Ok(false));
        assert_eq!(link.refresh_motor(42), Err(LinkError::NotFound));
    }

    #[test]
    fn test_registry_capacity() {
        let mut link = link(SimBus::default());
        for id in 0..MAX_MOTORS as u8 {
            link.add_motor(id).unwrap();
        }
        assert_eq!(link.add_motor(200), Err(LinkError::Capacity));
    }

    #[test]
    fn test_refresh_all_counts_responders() {
        let mut link = link(SimBus::with_controller(3));
        link.add_motor(3).unwrap();
        link.add_motor(5).unwrap();
        assert_eq!(link.refresh_all_motors(), Ok(1));
    }

    #[test]
    fn test_refresh_all_continues_past_broken_device() {
        let mut link = link(SimBus::with_controller(3));
        link.add_motor(2).unwrap();
        link.add_motor(3).unwrap();
        link.uart.written.clear();
        link.uart.broken_device = Some(2);
        assert_eq!(link.refresh_all_motors(), Ok(1));
        assert!(link.uart.opcodes_to(3).contains(&opcode::GET_VARIABLE));
    }

    #[test]
    fn test_estop_all_sweeps_every_address() {
        let mut link = link(SimBus::default());
        link.estop_all_motors().unwrap();
        let stops: StdVec<u8> = link
            .uart
            .written
            .iter()
            .filter(|f| f[2] == opcode::STOP_MOTOR)
            .map(|f| f[1])
            .collect();
        assert_eq!(stops.len(), 254);
        assert_eq!(stops.first(), Some(&0));
        assert_eq!(stops.last(), Some(&253));
    }

    #[test]
    fn test_estop_all_survives_write_error() {
        let mut bus = SimBus::default();
        bus.broken_device = Some(5);
        let mut link = link(bus);

        assert_eq!(link.estop_all_motors(), Err(LinkError::Serial));
        let stops: StdVec<u8> = link
            .uart
            .written
            .iter()
            .filter(|f| f[2] == opcode::STOP_MOTOR)
            .map(|f| f[1])
            .collect();
        assert_eq!(stops.len(), 253);
        assert!(!stops.contains(&5));
        assert!(stops.contains(&6));
        assert_eq!(stops.last(), Some(&253));
    }

    #[test]
    fn test_estop_motor_stops_when_brake_fails() {
        struct BrakeFails(StdVec<StdVec<u8>>);

        impl UartTx for BrakeFails {
            type Error = ();

            fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
                if data[2] == opcode::MOTOR_BRAKE {
                    return Err(());
                }
                self.0.push(data.to_vec());
                Ok(())
            }

            fn flush(&mut self) -> Result<(), ()> {
                Ok(())
            }
        }

        impl UartRx for BrakeFails {
            type Error = ();

            fn read_timeout(&mut self, _buf: &mut [u8], _timeout_ms: u32) -> Result<usize, ()> {
                Ok(0)
            }
        }

        let mut link = MotorLink::new(BrakeFails(StdVec::new()), &MotorLinkConfig::default());
        assert_eq!(link.estop_motor(4), Err(LinkError::Serial));
        assert_eq!(link.uart.0, vec![vec![0xAAu8, 0x04, 0x60]]);
    }

    #[test]
    fn test_safe_start_continues_past_failure() {
        let mut link = link(SimBus::default());
        link.add_motor(2).unwrap();
        link.add_motor(6).unwrap();
        link.uart.written.clear();
        link.uart.broken_device = Some(2);

        assert_eq!(link.safe_start_all_motors(), Err(LinkError::Serial));
        assert_eq!(link.uart.opcodes_to(6), vec![opcode::EXIT_SAFE_START]);
    }

    #[test]
    fn test_safe_start_only_registered() {
        let mut link = link(SimBus::default());
        link.add_motor(2).unwrap();
        link.add_motor(6).unwrap();
        link.uart.written.clear();

        link.safe_start_all_motors().unwrap();
        let targets: StdVec<u8> = link.uart.written.iter().map(|f| f[1]).collect();
        assert_eq!(targets, vec![2u8, 6]);
        assert!(link
            .uart
            .written
            .iter()
            .all(|f| f[2] == opcode::EXIT_SAFE_START));
    }
}
