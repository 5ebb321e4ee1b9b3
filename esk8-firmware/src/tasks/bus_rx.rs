//! Vehicle bus receive task
//!
//! Pushes received bytes into the frame accumulator and applies every
//! complete frame to the shared telemetry.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use esk8_protocol::{Address, FrameAccumulator, FrameError, Message};

use crate::channels::TELEMETRY;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Bus RX task - receives frames from the ESC/BMS bus
#[embassy_executor::task]
pub async fn bus_rx_task(mut rx: BufferedUartRx, source: Address) {
    info!("Bus RX task started, telemetry from {:?}", source);

    let mut frames = FrameAccumulator::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                let dropped = frames.push(&buf[..n]);
                if dropped > 0 {
                    warn!("RX overflow, dropped {} bytes", dropped);
                }

                drain(&mut frames, source).await;
            }
            Ok(_) => {
                // No bytes read, continue
            }
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}

/// Handle every complete frame held by the accumulator
async fn drain(frames: &mut FrameAccumulator, source: Address) {
    loop {
        match frames.next_message() {
            Ok(Some(msg)) => handle_message(&msg, source).await,
            Ok(None) => break,
            Err(FrameError::ChecksumMismatch) => {
                warn!("Dropped frame with bad checksum");
            }
            Err(e) => {
                warn!("Frame parse error: {:?}", e);
            }
        }
    }
}

async fn handle_message(msg: &Message, source: Address) {
    // Our own requests echo back on the half-duplex line
    if msg.src_address == Address::SELF.as_u8() {
        trace!("Echo of request for reg {=u8:#x}", msg.argument);
        return;
    }

    let mut telemetry = TELEMETRY.lock().await;
    match telemetry.apply(source, msg) {
        Ok(updated) => {
            debug!("Reg {=u8:#x}: {} registers updated", msg.argument, updated);
        }
        Err(e) => {
            trace!(
                "Ignored frame {=u8:#x}->{=u8:#x} cmd {=u8:#x}: {:?}",
                msg.src_address,
                msg.dst_address,
                msg.command,
                e
            );
        }
    }
}
