//! esk8 - Electric Skateboard Controller Firmware
//!
//! Main firmware binary for RP2040-based controllers. Bridges the ESC/BMS
//! serial bus and a PS/2 remote to the throttle output.
//!
//! Pin assignment:
//! - GPIO0/1: bus UART0 TX/RX
//! - GPIO2/3: remote clock/data
//! - GPIO8: throttle PWM (slice 4, channel A)

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use esk8_core::config::{Settings, SettingsError, SettingsStore};
use esk8_hal::uart::UartConfig;
use esk8_hal_rp2040::flash::Rp2040FlashStorage;
use esk8_hal_rp2040::gpio::DataPin;
use esk8_hal_rp2040::uart::to_rp_config;

use crate::channels::{TELEMETRY, THROTTLE_LEVEL};
use crate::tasks::PwmThrottle;

mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 512]> = StaticCell::new();

/// Seconds between status log lines
const STATUS_INTERVAL_S: u64 = 10;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("esk8 firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let settings = {
        let storage = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH0);
        let mut store = SettingsStore::new(storage);
        load_settings(&mut store).await
    };
    info!("Settings: {:?}", settings);

    // Bus UART
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 512]);

    let uart_config = to_rp_config(&UartConfig::default());
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized for bus communication");

    // Remote line, idle high
    let clock = Input::new(p.PIN_2, Pull::Up);
    let data = DataPin::new(p.PIN_3.into());

    // Throttle output
    let pwm = Pwm::new_output_a(p.PWM_SLICE4, p.PIN_8, PwmConfig::default());
    let throttle = PwmThrottle::new(pwm);

    info!("Remote line and throttle initialized");

    // Spawn tasks
    unwrap!(spawner.spawn(tasks::bus_rx_task(rx, settings.telemetry_source)));
    unwrap!(spawner.spawn(tasks::bus_poll_task(
        tx,
        settings.telemetry_source,
        settings.poll_interval_ms,
    )));
    unwrap!(spawner.spawn(tasks::ps2_task(clock, data, settings.remote_parity)));
    unwrap!(spawner.spawn(tasks::remote_task(throttle, settings.throttle)));

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(STATUS_INTERVAL_S).await;
        log_status().await;
    }
}

/// Load settings from flash
///
/// An unreadable blob is replaced with the defaults. Flash failures fall
/// back to defaults without touching storage.
async fn load_settings(store: &mut SettingsStore<Rp2040FlashStorage<'_>>) -> Settings {
    match store.load().await {
        Ok(settings) => settings,
        Err(SettingsError::Flash(e)) => {
            error!("Settings flash error: {:?}, using defaults", e);
            Settings::default()
        }
        Err(e) => {
            warn!("Stored settings unusable: {:?}, restoring defaults", e);
            match store.restore_defaults().await {
                Ok(settings) => settings,
                Err(e) => {
                    error!("Failed to restore defaults: {:?}", e);
                    Settings::default()
                }
            }
        }
    }
}

/// Log a summary of the battery and throttle state
async fn log_status() {
    let telemetry = TELEMETRY.lock().await;

    if let (Some(voltage), Some(pct)) = (telemetry.voltage_10mv, telemetry.capacity_pct) {
        info!(
            "Battery {}.{=u16:02} V, {}%",
            voltage / 100,
            voltage % 100,
            pct
        );
    } else {
        debug!("No battery telemetry yet");
    }

    if let Some((lo, hi)) = telemetry.cell_spread() {
        debug!("Cells {}..{} mV", lo, hi);
    }
    if let Some(current) = telemetry.current_10ma {
        debug!("Current {} x10 mA", current);
    }

    if let Some(level) = THROTTLE_LEVEL.try_take() {
        debug!("Throttle {}", level);
    }
}
