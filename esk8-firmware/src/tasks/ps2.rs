//! Remote line task
//!
//! Samples the data line on each falling clock edge and forwards decoded
//! key actions to the remote task. The task owns its decoder state.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{with_timeout, Duration};

use esk8_core::input::{KeyDecoder, Ps2Port};
use esk8_hal_rp2040::gpio::DataPin;
use esk8_protocol::ParityMode;

use crate::channels::{RemoteEvent, REMOTE_CHANNEL};

/// Longest gap between clock edges inside one frame
///
/// The remote clocks at 10-16.7 kHz, so a frame takes about 1 ms.
const BIT_TIMEOUT: Duration = Duration::from_millis(2);

/// Self-test passed, sent by the remote after power-up
const SELF_TEST_PASSED: u8 = 0xAA;

/// Consecutive bad frames before the remote counts as gone
const MAX_LINE_ERRORS: u8 = 3;

/// PS/2 task - decodes the remote line
#[embassy_executor::task]
pub async fn ps2_task(mut clock: Input<'static>, data: DataPin<'static>, parity: ParityMode) {
    info!("PS/2 task started, parity {:?}", parity);

    let mut port = Ps2Port::new(data, parity);
    let mut keys = KeyDecoder::new();
    let mut errors: u8 = 0;

    loop {
        if port.in_frame() {
            if with_timeout(BIT_TIMEOUT, clock.wait_for_falling_edge())
                .await
                .is_err()
            {
                debug!("Clock stalled mid-frame, resetting");
                port.reset();
                continue;
            }
        } else {
            clock.wait_for_falling_edge().await;
        }

        match port.on_clock_edge() {
            Ok(Some(byte)) => {
                trace!("PS/2 byte {=u8:#x}", byte);
                errors = 0;

                if byte == SELF_TEST_PASSED {
                    publish(RemoteEvent::Attached);
                } else if let Some(action) = keys.push(byte) {
                    publish(RemoteEvent::Key(action));
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("PS/2 frame error: {:?}", e);
                port.reset();

                errors = errors.saturating_add(1);
                if errors == MAX_LINE_ERRORS {
                    publish(RemoteEvent::Detached);
                }
            }
        }
    }
}

fn publish(event: RemoteEvent) {
    // Dropping if full
    if REMOTE_CHANNEL.try_send(event).is_err() {
        warn!("Remote channel full, dropping {:?}", event);
    }
}
