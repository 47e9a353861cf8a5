//! Main controller task
//!
//! Owns the scheduler and every actuator. Ticks drive the show; control
//! requests are handled between ticks so an estop can never interleave
//! with cue dispatch. Everything the scheduler reports is logged here.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_rp::uart::BufferedUart;
use embassy_time::{Duration, Ticker};

use cadence_core::control::SystemControl;
use cadence_core::scheduler::{RunState, Scheduler, SchedulerEvent, TickReport};
use cadence_drivers::motor::MotorLink;
use cadence_drivers::relay::Pcf8574Relays;
use cadence_hal_rp2040::uart::DeadlineSerial;

use crate::channels::{ControlRequest, CONTROL_CHANNEL};
use crate::outputs::SharedDmx;
use crate::rtc::WallClock;
use crate::tasks::tick::TICK_SIGNAL;
use crate::BoardBus;

pub type Motors = MotorLink<DeadlineSerial<BufferedUart>>;
pub type Relays = Pcf8574Relays<BoardBus>;
pub type Control = SystemControl<Motors, Relays, SharedDmx>;

/// Interval between motor telemetry refreshes
const MOTOR_POLL_INTERVAL_S: u64 = 30;

/// Controller task - main coordination loop
#[embassy_executor::task]
pub async fn controller_task(
    scheduler: &'static mut Scheduler,
    mut control: Control,
    clock: WallClock<'static>,
    autostart: bool,
) {
    info!("Controller task started");

    // Power-up: sweep the whole bus, then let known motors run
    info!("Stopping all motor addresses...");
    if let Err(e) = control.enable() {
        warn!("Motor power-up sequence failed: {:?}", e);
    }
    poll_motors(scheduler, &mut control);

    if autostart {
        scheduler.start();
        info!("Scheduler running");
    } else {
        info!("Scheduler idle (autostart disabled)");
    }

    let mut motor_poll = Ticker::every(Duration::from_secs(MOTOR_POLL_INTERVAL_S));

    loop {
        // Control requests are polled first so a pending estop beats a tick
        match select3(CONTROL_CHANNEL.receive(), TICK_SIGNAL.wait(), motor_poll.next()).await {
            Either3::First(request) => {
                handle_request(request, scheduler, &mut control, autostart);
            }
            Either3::Second(now_ms) => {
                let now = clock.now(now_ms);
                let report = scheduler.tick(now_ms, &now, &mut control);
                log_report(&report);
            }
            Either3::Third(()) => {
                poll_motors(scheduler, &mut control);
            }
        }
    }
}

fn handle_request(
    request: ControlRequest,
    scheduler: &mut Scheduler,
    control: &mut Control,
    autostart: bool,
) {
    match request {
        ControlRequest::Estop => {
            // Nothing may dispatch after this point until restart
            scheduler.stop();
            scheduler.abort_all();
            if let Err(e) = control.estop() {
                error!("Estop sweep incomplete: {:?}", e);
            }
            warn!(
                "*ESTOP* engaged (trip #{})",
                control.interlock().trip_count()
            );
        }
        ControlRequest::Restart => {
            if !control.is_estopped() {
                return;
            }
            if let Err(e) = control.restart() {
                warn!("Safe-start after estop failed: {:?}", e);
            }
            info!("Resetting from ESTOP");
            if autostart && scheduler.state() == RunState::Stopped {
                scheduler.start();
                info!("Scheduler running");
            }
        }
    }
}

/// Refresh motor telemetry and report faults
///
/// Each refresh is a burst of blocking request/reply exchanges, so it is
/// skipped while sequences are playing.
fn poll_motors(scheduler: &Scheduler, control: &mut Control) {
    if scheduler.running().next().is_some() {
        trace!("Motor poll skipped, show in progress");
        return;
    }

    match control.motors_mut().refresh_all_motors() {
        Ok(answered) => {
            let registered = control.motors().motors().len();
            if answered < registered {
                warn!("{} of {} motors answered", answered, registered);
            } else {
                debug!("{} motors answered", answered);
            }
        }
        Err(e) => {
            warn!("Motor poll failed: {:?}", e);
            return;
        }
    }

    for motor in control.motors().motors() {
        if motor.status.errors.has_fault() {
            warn!("Motor {} fault: {:?}", motor.device_id, motor.status.errors);
        } else {
            trace!(
                "Motor {}: speed {} vin {}mV temp {}",
                motor.device_id,
                motor.speed,
                motor.input_voltage_mv,
                motor.temperature_x10
            );
        }
    }
}

fn log_report(report: &TickReport) {
    for event in report.events() {
        match *event {
            SchedulerEvent::SequenceStarted { sequence_id, slot } => {
                info!("Sequence {} started in slot {}", sequence_id, slot)
            }
            SchedulerEvent::NoFreeSlot { sequence_id } => {
                warn!("Sequence {} due but every slot is busy", sequence_id)
            }
            SchedulerEvent::CueDispatched {
                sequence_id,
                cue_index,
                outcome,
            } => debug!("Sequence {} cue {}: {:?}", sequence_id, cue_index, outcome),
            SchedulerEvent::CueRejected {
                sequence_id,
                cue_index,
                error,
            } => warn!(
                "Sequence {} cue {} rejected: {:?}",
                sequence_id, cue_index, error
            ),
            SchedulerEvent::SequenceFinished { sequence_id, slot } => {
                info!("Sequence {} finished, slot {} free", sequence_id, slot)
            }
        }
    }
    if report.dropped() > 0 {
        warn!("{} scheduler events not logged", report.dropped());
    }
}
