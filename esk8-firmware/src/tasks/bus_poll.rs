//! Vehicle bus poll task
//!
//! Sends one telemetry read request per interval, cycling through the
//! BMS register set.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embassy_time::{Duration, Ticker};

use esk8_core::bus::{send, PollSchedule};
use esk8_hal_rp2040::uart::IoUartTx;
use esk8_protocol::Address;

/// Bus poll task - requests telemetry from `target`
#[embassy_executor::task]
pub async fn bus_poll_task(tx: BufferedUartTx, target: Address, interval_ms: u16) {
    info!("Bus poll task started, every {} ms", interval_ms);

    let mut tx = IoUartTx::new(tx);
    let mut schedule = PollSchedule::new(target);
    let mut ticker = Ticker::every(Duration::from_millis(interval_ms as u64));

    loop {
        ticker.next().await;

        let msg = match schedule.next_request() {
            Ok(msg) => msg,
            Err(e) => {
                error!("Failed to build request: {:?}", e);
                continue;
            }
        };

        match send(&mut tx, &msg) {
            Ok(len) => trace!("TX: read reg {=u8:#x}, {} bytes", msg.argument, len),
            Err(e) => warn!("Failed to send request: {:?}", e),
        }
    }
}
