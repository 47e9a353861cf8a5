//! DMX512 transmit task
//!
//! Streams the shared universe out continuously: an 88us break, the
//! mark-after-break, then the start code and channel slots at
//! 250 kbaud 8N2. Receivers treat a universe that stops refreshing as lost,
//! so frames are sent at a fixed period whether or not anything changed.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_rp::uart::{Async, UartTx};
use embassy_time::{Duration, Ticker};

use cadence_drivers::dmx::DMX_SLOTS;

use crate::outputs::SharedUniverse;

/// Break length in bit times at 250 kbaud (22 bits = 88us)
const BREAK_BITS: u32 = 22;

/// DMX transmit task
///
/// `driver_enable` holds the RS-485 transceiver in transmit mode for the
/// lifetime of the task.
#[embassy_executor::task]
pub async fn dmx_task(
    mut tx: UartTx<'static, Async>,
    _driver_enable: Output<'static>,
    universe: &'static SharedUniverse,
    refresh_interval_ms: u32,
) {
    info!("DMX task started ({}ms refresh)", refresh_interval_ms);

    let mut ticker = Ticker::every(Duration::from_millis(refresh_interval_ms as u64));
    let mut frame = [0u8; DMX_SLOTS];

    loop {
        ticker.next().await;

        let (len, changed) = universe.lock(|u| {
            let mut u = u.borrow_mut();
            let data = u.frame();
            frame[..data.len()].copy_from_slice(data);
            (data.len(), u.take_dirty())
        });
        if changed {
            trace!("DMX frame updated");
        }

        tx.send_break(BREAK_BITS).await;
        if let Err(e) = tx.write(&frame[..len]).await {
            warn!("DMX write error: {:?}", e);
        }
    }
}
