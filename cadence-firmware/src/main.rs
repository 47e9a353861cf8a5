//! Cadence - Show Control Firmware
//!
//! Main firmware binary for RP2040-based show controllers. Plays timed
//! motor, relay and DMX cues from sequences started by calendar schedules.
//!
//! Board wiring:
//! - UART1 (GPIO4 TX, GPIO5 RX): motor controller bus
//! - UART0 (GPIO0 TX): DMX512 out, transceiver enables on GPIO22/GPIO23
//! - I2C0 (GPIO20 SDA, GPIO21 SCL): relay expander and temperature sensor
//! - GPIO16: emergency stop switch, active low

#![no_std]
#![no_main]

extern crate alloc;

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, UART1};
use embassy_rp::rtc::Rtc;
use embassy_rp::uart::{BufferedInterruptHandler, Uart, UartTx};
use embassy_sync::blocking_mutex::Mutex;
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use cadence_core::control::SystemControl;
use cadence_core::scheduler::{Scheduler, SequenceStore};
use cadence_drivers::dmx::DmxUniverse;
use cadence_drivers::motor::MotorLink;
use cadence_drivers::relay::Pcf8574Relays;
use cadence_drivers::sensor::{self, at30ts750, At30ts750};
use cadence_hal::i2c::I2cConfig;
use cadence_hal::uart::UartConfig;
use cadence_hal_rp2040::flash::Rp2040FlashStorage;
use cadence_hal_rp2040::i2c::{i2c_config, I2cMutex, SharedI2c};
use cadence_hal_rp2040::uart::{uart_config, DeadlineSerial};

use crate::config::{parse_show, ConfigPersistence, ShowPersistence, ShowSettings};
use crate::outputs::{SharedDmx, SharedUniverse};
use crate::rtc::WallClock;

mod channels;
mod config;
mod outputs;
mod rtc;
mod tasks;

// Heap allocator for show parsing and persistence
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 32KB
const HEAP_SIZE: usize = 32 * 1024;

/// Embedded default show (compiled into firmware)
/// Edit show.toml and rebuild to customize
const EMBEDDED_SHOW: &str = include_str!("../show.toml");

/// Board I2C bus
pub type BoardI2c = I2c<'static, I2C0, i2c::Blocking>;

/// Handle to the shared board I2C bus
pub type BoardBus = SharedI2c<'static, BoardI2c>;

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

// Static cells for UART buffers (must live forever)
static MOTOR_TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static MOTOR_RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

// Shared state handed to tasks by reference
static SCHEDULER: StaticCell<Scheduler> = StaticCell::new();
static I2C_BUS: StaticCell<I2cMutex<BoardI2c>> = StaticCell::new();
static DMX_UNIVERSE: StaticCell<SharedUniverse> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Cadence firmware starting...");

    init_heap();

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Show tables are large, build them in place
    let scheduler = SCHEDULER.init_with(Scheduler::new);
    let settings = load_embedded_show(scheduler.store_mut());

    let mut storage = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH2);
    let config = ConfigPersistence::new(&mut storage)
        .load_or_seed(settings.config)
        .await;
    restore_show(&mut storage, scheduler.store_mut()).await;
    info!(
        "Show ready: {} sequences, {} schedules",
        scheduler.store().sequence_count(),
        scheduler.store().schedule_count()
    );

    // Motor controller bus
    let motor_uart_config = uart_config(&UartConfig {
        baudrate: config.motor.baud_rate,
        ..Default::default()
    });
    let tx_buf = MOTOR_TX_BUF.init([0u8; 64]);
    let rx_buf = MOTOR_RX_BUF.init([0u8; 64]);
    let motor_uart = Uart::new_blocking(p.UART1, p.PIN_4, p.PIN_5, motor_uart_config)
        .into_buffered(Irqs, tx_buf, rx_buf);

    let mut motors = MotorLink::new(DeadlineSerial::new(motor_uart), &config.motor);
    for &device_id in &settings.motors {
        if let Err(e) = motors.add_motor(device_id) {
            warn!("Motor {} registration failed: {:?}", device_id, e);
        } else if let Some(m) = motors.get_motor(device_id) {
            info!(
                "Motor {}: product {:#x} firmware {}.{}",
                device_id, m.firmware.product_id, m.firmware.major, m.firmware.minor
            );
        }
    }
    info!("Motor bus initialized at {} baud", config.motor.baud_rate);

    // Board I2C: relay expander and temperature sensor
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_21, p.PIN_20, i2c_config(&I2cConfig::STANDARD));
    let i2c_bus: &'static I2cMutex<BoardI2c> = I2C_BUS.init(Mutex::new(RefCell::new(i2c)));

    let found = sensor::scan(&mut SharedI2c::new(i2c_bus));
    info!("I2C devices: {:?}", found.as_slice());

    let mut relays = Pcf8574Relays::new(SharedI2c::new(i2c_bus), config.relay.i2c_address);
    if let Err(e) = relays.all_off() {
        warn!("Relay board not responding: {:?}", e);
    }
    let board_sensor = At30ts750::new(SharedI2c::new(i2c_bus), at30ts750::DEFAULT_ADDRESS);

    // DMX512 output
    let universe: &'static SharedUniverse = DMX_UNIVERSE.init(Mutex::new(RefCell::new(
        DmxUniverse::new(config.dmx.channels),
    )));
    let dmx_tx = UartTx::new(p.UART0, p.PIN_0, p.DMA_CH0, uart_config(&UartConfig::DMX512));
    let dmx_driver_enable = Output::new(p.PIN_22, Level::High);
    // Receiver enable is active low; the port only transmits
    let _dmx_receiver_disable = Output::new(p.PIN_23, Level::High);
    info!("DMX output initialized ({} slots)", config.dmx.channels);

    let estop_pin = Input::new(p.PIN_16, Pull::Up);

    let adc = Adc::new(p.ADC, Irqs, embassy_rp::adc::Config::default());
    let cpu_sensor = Channel::new_temp_sensor(p.ADC_TEMP_SENSOR);

    let clock = WallClock::new(Rtc::new(p.RTC), config.clock.boot_epoch_s);

    let control = SystemControl::new(motors, relays, SharedDmx::new(universe));

    spawner
        .spawn(tasks::tick_task(config.scheduler.tick_interval_ms))
        .unwrap();
    spawner.spawn(tasks::estop_task(estop_pin)).unwrap();
    spawner
        .spawn(tasks::dmx_task(
            dmx_tx,
            dmx_driver_enable,
            universe,
            config.dmx.refresh_interval_ms,
        ))
        .unwrap();
    spawner
        .spawn(tasks::status_task(board_sensor, adc, cpu_sensor))
        .unwrap();
    spawner
        .spawn(tasks::controller_task(
            scheduler,
            control,
            clock,
            config.scheduler.autostart,
        ))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}

/// Parse the embedded show into `store`
///
/// A broken show.toml leaves the store empty and returns default settings.
/// build.rs validates the file, so this only happens during development.
fn load_embedded_show(store: &mut SequenceStore) -> ShowSettings {
    match parse_show(EMBEDDED_SHOW, store) {
        Ok(settings) => {
            info!("Parsed embedded show successfully");
            settings
        }
        Err(e) => {
            error!("Failed to parse embedded show: {:?}", e);
            error!("Starting with an empty show");
            store.clear_all_schedules();
            store.clear_all_sequences();
            ShowSettings::default()
        }
    }
}

/// Replace the embedded show with the one in flash, or store it on first boot
async fn restore_show(storage: &mut Rp2040FlashStorage<'_>, store: &mut SequenceStore) {
    let mut show = ShowPersistence::new(storage);

    if !show.is_stored().await {
        info!("No show in flash, storing embedded show");
        if let Err(e) = show.save(store).await {
            warn!("Failed to store show: {:?}", e);
        }
        return;
    }

    if let Err(e) = show.load(store).await {
        warn!("Stored show unusable ({:?}), using embedded show", e);
        load_embedded_show(store);
    }
}
