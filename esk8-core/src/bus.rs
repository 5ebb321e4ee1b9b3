//! Outbound bus traffic
//!
//! Frames are serialized into a stack buffer and handed to the transmitter
//! in one write. Telemetry polling walks a fixed list of register reads.

use esk8_hal::uart::UartTx;
use esk8_protocol::registers::CELL_COUNT;
use esk8_protocol::{read_register, Address, FrameError, Message, Register, MAX_FRAME_SIZE};

/// Bus transmit errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// Transmitter failed
    Uart(E),
    /// Frame could not be built or serialized
    Frame(FrameError),
}

impl<E> From<FrameError> for BusError<E> {
    fn from(e: FrameError) -> Self {
        BusError::Frame(e)
    }
}

/// Serialize `msg` and write it to the bus
///
/// Returns the number of bytes written. The stored checksum is sent as is.
pub fn send<T: UartTx>(tx: &mut T, msg: &Message) -> Result<usize, BusError<T::Error>> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let len = msg.serialize(&mut buffer)?;

    tx.write_all(&buffer[..len]).map_err(BusError::Uart)?;
    tx.flush().map_err(BusError::Uart)?;
    Ok(len)
}

/// Registers polled in turn, with the byte count read from each
const POLL_SET: [(Register, u8); 4] = [
    // Capacity mAh through temperatures
    (Register::CapacityMah, 10),
    (Register::Health, 2),
    (Register::Cell0Voltage, 2 * CELL_COUNT as u8),
    // Firmware version through charge count
    (Register::FirmwareVersion, 12),
];

/// Round-robin telemetry request generator
#[derive(Debug, Clone)]
pub struct PollSchedule {
    target: Address,
    index: usize,
}

impl PollSchedule {
    /// Create a schedule polling `target`
    pub fn new(target: Address) -> Self {
        Self { target, index: 0 }
    }

    /// Device being polled
    pub fn target(&self) -> Address {
        self.target
    }

    /// Number of requests in one full cycle
    pub fn cycle_len(&self) -> usize {
        POLL_SET.len()
    }

    /// Build the next read request, wrapping at the end of the cycle
    pub fn next_request(&mut self) -> Result<Message, FrameError> {
        let (reg, len) = POLL_SET[self.index];
        self.index = (self.index + 1) % POLL_SET.len();
        read_register(self.target, reg, len)
    }
}
