//! Tick task
//!
//! Drives the scheduler: every tick the controller matches schedules and
//! plays due cues. The tick carries milliseconds since boot as a wrapping
//! `u32`, the time base for all cue offsets.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};

/// Signal to notify controller of tick
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, u32> = Signal::new();

/// Tick task - sends periodic tick signals with timestamp
#[embassy_executor::task]
pub async fn tick_task(interval_ms: u32) {
    info!("Tick task started ({}ms)", interval_ms);

    let mut ticker = Ticker::every(Duration::from_millis(interval_ms.max(1) as u64));
    let start = Instant::now();

    loop {
        ticker.next().await;

        // Truncation wraps after ~49 days; cue timing uses wrapping arithmetic
        let now_ms = start.elapsed().as_millis() as u32;

        TICK_SIGNAL.signal(now_ms);
    }
}
