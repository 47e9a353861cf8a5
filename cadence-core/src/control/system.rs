//! Top-level output context
//!
//! [`SystemControl`] owns the motor bus, relay bank and DMX universe along
//! with the emergency stop interlock. It is the [`CueSink`] the scheduler
//! dispatches into, and every output path goes through the interlock first.

use cadence_protocol::{Cue, CueKind};

use crate::safety::Interlock;
use crate::traits::{
    CueSink, DeviceKind, DispatchError, DispatchOutcome, DmxOutput, MotorBus, RelayOutput,
};

/// Highest relay device id a cue may address
pub const MAX_RELAY_DEVICE: u8 = 7;

/// Output context shared by cue dispatch and direct commands
pub struct SystemControl<M, R, D> {
    motors: M,
    relays: R,
    dmx: D,
    interlock: Interlock,
}

impl<M, R, D> SystemControl<M, R, D>
where
    M: MotorBus,
    R: RelayOutput,
    D: DmxOutput,
{
    pub fn new(motors: M, relays: R, dmx: D) -> Self {
        Self {
            motors,
            relays,
            dmx,
            interlock: Interlock::new(),
        }
    }

    /// Drive a motor directly
    pub fn send_motor_command(
        &mut self,
        device_id: u8,
        percent: u16,
        forward: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.interlock.check()?;
        self.motors
            .set_motor(device_id, forward, percent)
            .map_err(|_| DispatchError::Device(DeviceKind::Motor))?;
        Ok(DispatchOutcome::Sent)
    }

    /// Switch a relay by cue device id (1-based)
    pub fn set_relay(&mut self, device_id: u8, on: bool) -> Result<DispatchOutcome, DispatchError> {
        self.interlock.check()?;
        if device_id == 0
            || device_id > MAX_RELAY_DEVICE
            || device_id > self.relays.channels()
        {
            return Ok(DispatchOutcome::Ignored);
        }
        self.relays
            .set_relay(device_id - 1, on)
            .map_err(|_| DispatchError::Device(DeviceKind::Relay))?;
        Ok(DispatchOutcome::Sent)
    }

    /// Set a DMX channel level, channel 0 is the start code and not addressable
    pub fn set_dmx(&mut self, channel: u16, level: u8) -> Result<DispatchOutcome, DispatchError> {
        self.interlock.check()?;
        if channel == 0 || channel >= self.dmx.channels() {
            return Ok(DispatchOutcome::Ignored);
        }
        self.dmx
            .set_level(channel, level)
            .map_err(|_| DispatchError::Device(DeviceKind::Dmx))?;
        Ok(DispatchOutcome::Sent)
    }

    /// Engage the emergency stop and halt every motor address
    ///
    /// The latch is engaged before the bus sweep, so a failed sweep still
    /// blocks further dispatch.
    pub fn estop(&mut self) -> Result<(), DispatchError> {
        self.interlock.trip();
        self.motors
            .estop_all()
            .map_err(|_| DispatchError::Device(DeviceKind::Motor))
    }

    /// Release the emergency stop and clear safe-start on known motors
    pub fn restart(&mut self) -> Result<(), DispatchError> {
        self.interlock.reset();
        self.motors
            .safe_start_all()
            .map_err(|_| DispatchError::Device(DeviceKind::Motor))
    }

    /// Power-up sequence: stop everything, then allow known motors to run
    pub fn enable(&mut self) -> Result<(), DispatchError> {
        self.motors
            .estop_all()
            .map_err(|_| DispatchError::Device(DeviceKind::Motor))?;
        self.motors
            .safe_start_all()
            .map_err(|_| DispatchError::Device(DeviceKind::Motor))
    }

    pub fn is_estopped(&self) -> bool {
        self.interlock.is_engaged()
    }

    pub fn interlock(&self) -> &Interlock {
        &self.interlock
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    /// Direct bus access for telemetry; bypasses the interlock
    pub fn motors_mut(&mut self) -> &mut M {
        &mut self.motors
    }

    pub fn relays(&self) -> &R {
        &self.relays
    }

    pub fn dmx(&self) -> &D {
        &self.dmx
    }

    pub fn dmx_mut(&mut self) -> &mut D {
        &mut self.dmx
    }
}

impl<M, R, D> CueSink for SystemControl<M, R, D>
where
    M: MotorBus,
    R: RelayOutput,
    D: DmxOutput,
{
    fn dispatch(&mut self, cue: &Cue) -> Result<DispatchOutcome, DispatchError> {
        self.interlock.check()?;
        match cue.kind() {
            CueKind::Motor => self.send_motor_command(cue.device_id(), cue.percent(), true),
            CueKind::Relay => self.set_relay(cue.device_id(), cue.percent() > 0),
            CueKind::Dmx => {
                let level = cue.percent().min(u8::MAX as u16) as u8;
                self.set_dmx(cue.device_id() as u16, level)
            }
            CueKind::Unknown(_) => Ok(DispatchOutcome::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockMotors {
        commands: Vec<(u8, bool, u16)>,
        estops: usize,
        safe_starts: usize,
        fail: bool,
    }

    impl MotorBus for MockMotors {
        type Error = ();

        fn set_motor(&mut self, device_id: u8, forward: bool, percent: u16) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.commands.push((device_id, forward, percent));
            Ok(())
        }

        fn estop_all(&mut self) -> Result<(), ()> {
            self.estops += 1;
            if self.fail {
                Err(())
            } else {
                Ok(())
            }
        }

        fn safe_start_all(&mut self) -> Result<(), ()> {
            self.safe_starts += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockRelays {
        state: [bool; 8],
    }

    impl RelayOutput for MockRelays {
        type Error = ();

        fn channels(&self) -> u8 {
            7
        }

        fn set_relay(&mut self, index: u8, on: bool) -> Result<(), ()> {
            self.state[index as usize] = on;
            Ok(())
        }
    }

    struct MockDmx {
        levels: [u8; 128],
    }

    impl DmxOutput for MockDmx {
        type Error = ();

        fn channels(&self) -> u16 {
            128
        }

        fn set_level(&mut self, channel: u16, level: u8) -> Result<(), ()> {
            self.levels[channel as usize] = level;
            Ok(())
        }
    }

    type Control = SystemControl<MockMotors, MockRelays, MockDmx>;

    fn control() -> Control {
        SystemControl::new(
            MockMotors::default(),
            MockRelays::default(),
            MockDmx { levels: [0; 128] },
        )
    }

    fn cue(text: &str) -> Cue {
        Cue::parse(text).unwrap()
    }

    #[test]
    fn test_motor_cue() {
        let mut ctl = control();
        let outcome = ctl.dispatch(&cue("$00000MOT0105012300%"));
        assert_eq!(outcome, Ok(DispatchOutcome::Sent));
        assert_eq!(ctl.motors().commands, vec![(1u8, true, 50u16)]);
    }

    #[test]
    fn test_relay_cues() {
        let mut ctl = control();
        ctl.dispatch(&cue("$00000REL0310000000%")).unwrap();
        assert!(ctl.relays().state[2]);

        ctl.dispatch(&cue("$00000REL0300000000%")).unwrap();
        assert!(!ctl.relays().state[2]);

        assert_eq!(
            ctl.dispatch(&cue("$00000REL0810000000%")),
            Ok(DispatchOutcome::Ignored)
        );
        assert_eq!(
            ctl.dispatch(&cue("$00000REL0010000000%")),
            Ok(DispatchOutcome::Ignored)
        );
    }

    #[test]
    fn test_dmx_cues() {
        let mut ctl = control();
        ctl.dispatch(&cue("$00000DMX0540000000%")).unwrap();
        assert_eq!(ctl.dmx().levels[5], 255);

        ctl.dispatch(&cue("$00000DMX0512800000%")).unwrap();
        assert_eq!(ctl.dmx().levels[5], 128);

        assert_eq!(
            ctl.dispatch(&cue("$00000DMX0010000000%")),
            Ok(DispatchOutcome::Ignored)
        );
    }

    #[test]
    fn test_unknown_cue_is_ignored() {
        let mut ctl = control();
        assert_eq!(
            ctl.dispatch(&cue("$00000FOG0105000000%")),
            Ok(DispatchOutcome::Ignored)
        );
        assert!(ctl.motors().commands.is_empty());
    }

    #[test]
    fn test_estop_blocks_every_path() {
        let mut ctl = control();
        ctl.estop().unwrap();
        assert!(ctl.is_estopped());
        assert_eq!(ctl.motors().estops, 1);

        for text in [
            "$00000MOT0105000000%",
            "$00000REL0110000000%",
            "$00000DMX0110000000%",
            "$00000FOG0110000000%",
        ] {
            assert_eq!(
                ctl.dispatch(&cue(text)),
                Err(DispatchError::SafetyViolation)
            );
        }
        assert_eq!(
            ctl.send_motor_command(1, 50, false),
            Err(DispatchError::SafetyViolation)
        );
        assert_eq!(ctl.set_relay(1, true), Err(DispatchError::SafetyViolation));
        assert_eq!(ctl.set_dmx(1, 10), Err(DispatchError::SafetyViolation));
        assert!(ctl.motors().commands.is_empty());
        assert!(!ctl.relays().state[0]);

        ctl.restart().unwrap();
        assert_eq!(ctl.motors().safe_starts, 1);
        assert_eq!(
            ctl.send_motor_command(1, 50, false),
            Ok(DispatchOutcome::Sent)
        );
        assert_eq!(ctl.motors().commands, vec![(1u8, false, 50u16)]);
    }

    #[test]
    fn test_estop_latches_even_when_sweep_fails() {
        let mut ctl = control();
        ctl.motors_mut().fail = true;
        assert_eq!(ctl.estop(), Err(DispatchError::Device(DeviceKind::Motor)));
        assert!(ctl.is_estopped());
    }

    #[test]
    fn test_enable_sequence() {
        let mut ctl = control();
        ctl.enable().unwrap();
        assert_eq!(ctl.motors().estops, 1);
        assert_eq!(ctl.motors().safe_starts, 1);
        assert!(!ctl.is_estopped());
    }

    #[test]
    fn test_device_error() {
        let mut ctl = control();
        ctl.motors_mut().fail = true;
        assert_eq!(
            ctl.send_motor_command(2, 10, true),
            Err(DispatchError::Device(DeviceKind::Motor))
        );
    }
}
