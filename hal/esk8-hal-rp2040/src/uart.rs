//! Vehicle bus UART
//!
//! RP2040 has two UART peripherals; the bus uses UART0 on GPIO 0/1.

use embassy_rp::uart;
use esk8_hal::uart::{DataBits, Parity, StopBits, UartConfig};

/// Build an embassy UART config from the shared description
pub fn to_rp_config(config: &UartConfig) -> uart::Config {
    let mut rp = uart::Config::default();
    rp.baudrate = config.baudrate;
    rp.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    rp.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    rp.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    rp
}

/// Bus transmitter over a blocking byte writer
///
/// Wraps e.g. `BufferedUartTx`, which queues into its ring buffer and
/// only blocks when that is full.
pub struct IoUartTx<W> {
    inner: W,
}

impl<W: embedded_io::Write> IoUartTx<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Reclaim the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: embedded_io::Write> esk8_hal::UartTx for IoUartTx<W> {
    type Error = W::Error;

    fn write_all(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(frame)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}
