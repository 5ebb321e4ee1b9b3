//! Remote input decoding
//!
//! The remote speaks the PS/2 keyboard protocol. Bits are sampled from the
//! data line on each falling clock edge, assembled into bytes, and the
//! resulting set 2 scan codes are mapped to throttle actions.

use esk8_hal::gpio::InputPin;
use esk8_protocol::{ParityMode, Ps2Error, Ps2Receiver};

/// Prefix of extended scan codes
pub const EXTENDED_PREFIX: u8 = 0xE0;
/// Prefix of key release codes
pub const BREAK_PREFIX: u8 = 0xF0;

/// Up arrow
pub const KEY_ACCELERATE: u8 = 0x75;
/// Down arrow
pub const KEY_BRAKE: u8 = 0x72;
/// Space bar
pub const KEY_STOP: u8 = 0x29;

/// Remote line sampler
///
/// Owns the data pin and the frame receiver. The clock edge itself is
/// detected by the caller.
pub struct Ps2Port<P> {
    data: P,
    receiver: Ps2Receiver,
}

impl<P: InputPin> Ps2Port<P> {
    /// Create a port sampling `data`
    pub fn new(data: P, parity: ParityMode) -> Self {
        Self {
            data,
            receiver: Ps2Receiver::new(parity),
        }
    }

    /// Sample the data line after a falling clock edge
    pub fn on_clock_edge(&mut self) -> Result<Option<u8>, Ps2Error> {
        let bit = self.data.is_high();
        self.receiver.feed(bit)
    }

    /// Drop a partial frame, e.g. after a clock timeout
    pub fn reset(&mut self) {
        self.receiver.reset();
    }

    /// Whether a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.receiver.in_frame()
    }
}

/// Actions produced by remote key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
    /// Raise throttle by one step
    Accelerate,
    /// Lower throttle by one step
    Brake,
    /// Drop throttle to idle
    Stop,
}

impl KeyAction {
    /// Map a make code to an action
    pub fn from_scan_code(code: u8) -> Option<Self> {
        match code {
            KEY_ACCELERATE => Some(KeyAction::Accelerate),
            KEY_BRAKE => Some(KeyAction::Brake),
            KEY_STOP => Some(KeyAction::Stop),
            _ => None,
        }
    }
}

/// Scan code stream decoder
///
/// Extended prefixes are skipped. Release sequences (`F0 xx`) are consumed
/// without producing an action, so a held key acts on press and on each
/// typematic repeat only.
#[derive(Debug, Clone, Default)]
pub struct KeyDecoder {
    releasing: bool,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one received byte
    pub fn push(&mut self, byte: u8) -> Option<KeyAction> {
        match byte {
            EXTENDED_PREFIX => None,
            BREAK_PREFIX => {
                self.releasing = true;
                None
            }
            _ if self.releasing => {
                self.releasing = false;
                None
            }
            code => KeyAction::from_scan_code(code),
        }
    }
}
