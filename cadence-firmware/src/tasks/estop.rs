//! Emergency stop input
//!
//! The estop switch pulls its input low while pressed. Pressing it requests
//! an emergency stop at the first falling edge; releasing it requests a
//! restart once the level has settled.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use cadence_core::safety::{EstopSwitch, SwitchEvent};

use crate::channels::{ControlRequest, CONTROL_CHANNEL};

/// Settle time before a level is trusted
const DEBOUNCE_MS: u64 = 20;

#[embassy_executor::task]
pub async fn estop_task(mut pin: Input<'static>) {
    info!("Estop task started");

    let mut switch = EstopSwitch::new(pin.is_low());
    if switch.is_engaged() {
        warn!("Estop engaged at boot");
        CONTROL_CHANNEL.send(ControlRequest::Estop).await;
    }

    loop {
        if switch.is_engaged() {
            pin.wait_for_high().await;
        } else {
            pin.wait_for_low().await;
            if switch.press_edge().is_some() {
                warn!("Estop pressed");
                CONTROL_CHANNEL.send(ControlRequest::Estop).await;
            }
        }

        Timer::after_millis(DEBOUNCE_MS).await;

        match switch.settled(pin.is_low()) {
            Some(SwitchEvent::Pressed) => {
                warn!("Estop pressed");
                CONTROL_CHANNEL.send(ControlRequest::Estop).await;
            }
            Some(SwitchEvent::Released) => {
                info!("Estop released");
                CONTROL_CHANNEL.send(ControlRequest::Restart).await;
            }
            None => {}
        }
    }
}
