//! Board status task
//!
//! Periodically reads the board temperature sensor and the RP2040's own
//! temperature sensor and logs both.

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_time::{Duration, Ticker};

use cadence_drivers::sensor::At30ts750;

use crate::BoardBus;

/// Interval between readings
const STATUS_INTERVAL_S: u64 = 60;

/// Board temperature that earns a warning (0.1°C)
const BOARD_TEMP_WARN_X10: i16 = 600;

#[embassy_executor::task]
pub async fn status_task(
    mut sensor: At30ts750<BoardBus>,
    mut adc: Adc<'static, Async>,
    mut cpu_sensor: Channel<'static>,
) {
    info!("Status task started");

    if let Err(e) = sensor.init() {
        warn!("Board temperature sensor init failed: {:?}", e);
    }

    let mut ticker = Ticker::every(Duration::from_secs(STATUS_INTERVAL_S));

    loop {
        match sensor.read_celsius_x10() {
            Ok(t) if t >= BOARD_TEMP_WARN_X10 => {
                warn!("Board temperature high: {}.{}°C", t / 10, (t % 10).abs())
            }
            Ok(t) => info!("Board temperature: {}.{}°C", t / 10, (t % 10).abs()),
            Err(e) => warn!("Board temperature read failed: {:?}", e),
        }

        match adc.read(&mut cpu_sensor).await {
            Ok(raw) => {
                let t = cpu_temp_x10(raw);
                info!("CPU temperature: {}.{}°C", t / 10, (t % 10).abs());
            }
            Err(e) => warn!("CPU temperature read failed: {:?}", e),
        }

        ticker.next().await;
    }
}

/// Convert a 12-bit reading of the internal sensor to 0.1°C
///
/// The sensor reads 706mV at 27°C with a slope of -1.721mV/°C.
fn cpu_temp_x10(raw: u16) -> i16 {
    let mv = raw as i32 * 3300 / 4096;
    (270 - (mv - 706) * 10_000 / 1721) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_temp_conversion() {
        // 706mV reads 27°C
        assert_eq!(cpu_temp_x10(877), 270);
        // Hotter chip, lower voltage
        assert!(cpu_temp_x10(850) > 270);
    }
}
