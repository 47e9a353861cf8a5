//! Wall clock
//!
//! Schedules match against calendar time from the RP2040 RTC. The RTC has
//! no battery backup, so at boot it is loaded with the configured epoch and
//! counts from there until something sets the real time. While the RTC is
//! not running yet the clock is derived from the tick counter instead.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use defmt::*;
use embassy_rp::peripherals::RTC;
use embassy_rp::rtc::{DateTime as RtcDateTime, DayOfWeek, Rtc};

/// Calendar time source for the scheduler
pub struct WallClock<'d> {
    rtc: Rtc<'d, RTC>,
    boot: NaiveDateTime,
}

impl<'d> WallClock<'d> {
    /// Start the RTC at `boot_epoch_s` unless it is already running
    pub fn new(mut rtc: Rtc<'d, RTC>, boot_epoch_s: i64) -> Self {
        let boot = DateTime::from_timestamp(boot_epoch_s, 0)
            .unwrap_or_default()
            .naive_utc();

        if rtc.is_running() {
            info!("RTC already running, keeping its time");
        } else if let Err(e) = rtc.set_datetime(to_rtc(&boot)) {
            warn!("Failed to set RTC: {:?}", e);
        } else {
            info!("RTC started at epoch {}", boot_epoch_s);
        }

        Self { rtc, boot }
    }

    /// Current calendar time
    ///
    /// `uptime_ms` is only used while the RTC cannot be read.
    pub fn now(&self, uptime_ms: u32) -> NaiveDateTime {
        match self.rtc.now() {
            Ok(now) => from_rtc(&now).unwrap_or(self.boot),
            Err(_) => self.boot + chrono::Duration::milliseconds(uptime_ms as i64),
        }
    }
}

fn to_rtc(t: &NaiveDateTime) -> RtcDateTime {
    RtcDateTime {
        year: t.year() as u16,
        month: t.month() as u8,
        day: t.day() as u8,
        day_of_week: match t.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        },
        hour: t.hour() as u8,
        minute: t.minute() as u8,
        second: t.second() as u8,
    }
}

fn from_rtc(t: &RtcDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(t.year as i32, t.month as u32, t.day as u32)?.and_hms_opt(
        t.hour as u32,
        t.minute as u32,
        t.second as u32,
    )
}
