//! PS/2-style remote line decoding
//!
//! The remote peripheral clocks out 11-bit frames:
//!
//! ```text
//! ┌───────┬────┬────┬────┬────┬────┬────┬────┬────┬────────┬──────┐
//! │ START │ D0 │ D1 │ D2 │ D3 │ D4 │ D5 │ D6 │ D7 │ PARITY │ STOP │
//! │ 0     │ LSB first                         │ MSB│        │ 1    │
//! └───────┴────┴────┴────┴────┴────┴────┴────┴────┴────────┴──────┘
//! ```
//!
//! [`BitDecoder`] accumulates the eight data bits. [`Ps2Receiver`] adds the
//! start/parity/stop framing on top of it.
//!
//! Neither type is synchronized. Each instance must be fed from a single
//! context (one interrupt handler or one task).

/// Number of data bits in a byte
pub const BITS_PER_BYTE: u8 = 8;

/// Outcome of feeding one bit to a [`BitDecoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitStatus {
    /// Bit stored, byte still incomplete
    Accepted,
    /// Bit stored and the byte is now complete
    Complete,
    /// Byte was already complete; the bit was not stored
    AlreadyComplete,
}

/// Errors from the remote line decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ps2Error {
    /// Parity bit does not match the received byte
    ParityMismatch,
    /// Parity was checked before all eight data bits arrived
    NotReady,
    /// Frame did not open with a low start bit
    BadStartBit,
    /// Frame did not close with a high stop bit
    BadStopBit,
}

/// Parity convention for the parity bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParityMode {
    /// Data bits plus parity bit hold an even number of ones
    Even,
    /// Data bits plus parity bit hold an odd number of ones (PS/2 wire default)
    #[default]
    Odd,
    /// Parity bit is ignored
    Ignore,
}

impl ParityMode {
    /// Check `parity_bit` against `value` under this convention
    pub fn matches(self, value: u8, parity_bit: bool) -> bool {
        let ones = value.count_ones() + parity_bit as u32;
        match self {
            ParityMode::Even => ones % 2 == 0,
            ParityMode::Odd => ones % 2 == 1,
            ParityMode::Ignore => true,
        }
    }
}

/// Accumulator for one byte, least significant bit first
///
/// States: accumulating while fewer than eight bits are held, ready once
/// the eighth arrives. Only [`reset`](Self::reset) leaves the ready state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitDecoder {
    value: u8,
    bit_index: u8,
}

impl BitDecoder {
    /// Create an empty decoder
    pub const fn new() -> Self {
        Self {
            value: 0,
            bit_index: 0,
        }
    }

    /// Store the next bit
    ///
    /// The eighth bit completes the byte and reports [`BitStatus::Complete`]
    /// on that same call. Further bits are ignored until a reset.
    pub fn add_bit(&mut self, bit: bool) -> BitStatus {
        if self.is_ready() {
            return BitStatus::AlreadyComplete;
        }

        self.value |= (bit as u8) << self.bit_index;
        self.bit_index += 1;

        if self.is_ready() {
            BitStatus::Complete
        } else {
            BitStatus::Accepted
        }
    }

    /// Check `parity_bit` against the held byte using even parity
    pub fn check_parity(&self, parity_bit: bool) -> Result<(), Ps2Error> {
        self.check_parity_with(ParityMode::Even, parity_bit)
    }

    /// Check `parity_bit` against the held byte under `mode`
    ///
    /// Fails with [`Ps2Error::NotReady`] until all eight bits are in.
    pub fn check_parity_with(&self, mode: ParityMode, parity_bit: bool) -> Result<(), Ps2Error> {
        if !self.is_ready() {
            return Err(Ps2Error::NotReady);
        }

        if mode.matches(self.value, parity_bit) {
            Ok(())
        } else {
            Err(Ps2Error::ParityMismatch)
        }
    }

    /// Clear the value and start again from bit 0
    pub fn reset(&mut self) {
        self.value = 0;
        self.bit_index = 0;
    }

    /// Whether all eight bits have been received
    pub fn is_ready(&self) -> bool {
        self.bit_index == BITS_PER_BYTE
    }

    /// Bits received so far
    pub fn bit_index(&self) -> u8 {
        self.bit_index
    }

    /// Value accumulated so far
    pub fn value(&self) -> u8 {
        self.value
    }

    /// The completed byte, if ready
    pub fn byte(&self) -> Option<u8> {
        self.is_ready().then_some(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    /// Waiting for the start bit
    Start,
    /// Reading the eight data bits
    Data,
    /// Waiting for the parity bit
    Parity,
    /// Waiting for the stop bit
    Stop,
}

/// Full-frame receiver for the remote line
///
/// Feed one sampled data-line bit per clock edge. A byte is returned once
/// its stop bit arrives and the frame checks out.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ps2Receiver {
    decoder: BitDecoder,
    phase: Phase,
    parity: ParityMode,
    parity_result: Result<(), Ps2Error>,
}

impl Default for Ps2Receiver {
    fn default() -> Self {
        Self::new(ParityMode::default())
    }
}

impl Ps2Receiver {
    /// Create a receiver using the given parity convention
    pub fn new(parity: ParityMode) -> Self {
        Self {
            decoder: BitDecoder::new(),
            phase: Phase::Start,
            parity,
            parity_result: Ok(()),
        }
    }

    /// Abandon any partial frame
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.phase = Phase::Start;
        self.parity_result = Ok(());
    }

    /// Whether a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.phase != Phase::Start
    }

    /// Feed one bit
    ///
    /// Returns `Ok(Some(byte))` when a frame completes, `Ok(None)` while
    /// more bits are needed. On error the receiver is back at the start of
    /// a frame.
    pub fn feed(&mut self, bit: bool) -> Result<Option<u8>, Ps2Error> {
        match self.phase {
            Phase::Start => {
                if bit {
                    return Err(Ps2Error::BadStartBit);
                }
                self.decoder.reset();
                self.parity_result = Ok(());
                self.phase = Phase::Data;
                Ok(None)
            }
            Phase::Data => {
                if self.decoder.add_bit(bit) != BitStatus::Accepted {
                    self.phase = Phase::Parity;
                }
                Ok(None)
            }
            Phase::Parity => {
                self.parity_result = self.decoder.check_parity_with(self.parity, bit);
                self.phase = Phase::Stop;
                Ok(None)
            }
            Phase::Stop => {
                self.phase = Phase::Start;
                if !bit {
                    return Err(Ps2Error::BadStopBit);
                }
                self.parity_result?;
                Ok(self.decoder.byte())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_byte(decoder: &mut BitDecoder, bits_msb_first: [u8; 8]) -> BitStatus {
        let mut status = BitStatus::Accepted;
        // Least significant bit first
        for j in 0..8 {
            status = decoder.add_bit(bits_msb_first[7 - j] == 1);
        }
        status
    }

    #[test]
    fn test_known_values() {
        let cases: [(u8, [u8; 8]); 4] = [
            (0, [0, 0, 0, 0, 0, 0, 0, 0]),
            (123, [0, 1, 1, 1, 1, 0, 1, 1]),
            (255, [1, 1, 1, 1, 1, 1, 1, 1]),
            (34, [0, 0, 1, 0, 0, 0, 1, 0]),
        ];

        let mut decoder = BitDecoder::new();
        for (expected, bits) in cases {
            assert_eq!(feed_byte(&mut decoder, bits), BitStatus::Complete);
            assert_eq!(decoder.value(), expected);
            decoder.reset();
        }
    }

    #[test]
    fn test_lsb_first_sequence() {
        let mut decoder = BitDecoder::new();
        let bits = [1, 1, 0, 1, 1, 1, 1, 0];

        for (i, &bit) in bits.iter().enumerate() {
            let status = decoder.add_bit(bit == 1);
            if i < 7 {
                assert_eq!(status, BitStatus::Accepted);
            } else {
                assert_eq!(status, BitStatus::Complete);
            }
        }
        assert_eq!(decoder.value(), 123);
        assert_eq!(decoder.byte(), Some(123));
    }

    #[test]
    fn test_ninth_bit_is_ignored() {
        let mut decoder = BitDecoder::new();
        for _ in 0..8 {
            decoder.add_bit(true);
        }
        decoder.reset();
        for &bit in &[false, true, true, true, true, false, true, true] {
            decoder.add_bit(bit);
        }
        let value = decoder.value();

        assert_eq!(decoder.add_bit(true), BitStatus::AlreadyComplete);
        assert_eq!(decoder.value(), value);
        assert_eq!(decoder.bit_index(), 8);
    }

    #[test]
    fn test_reset_restarts_at_bit_zero() {
        let mut decoder = BitDecoder::new();
        for _ in 0..8 {
            decoder.add_bit(true);
        }
        decoder.reset();

        assert_eq!(decoder.value(), 0);
        assert_eq!(decoder.bit_index(), 0);
        assert!(!decoder.is_ready());
        assert_eq!(decoder.add_bit(true), BitStatus::Accepted);
        assert_eq!(decoder.value(), 1);
    }

    #[test]
    fn test_reset_mid_byte() {
        let mut decoder = BitDecoder::new();
        decoder.add_bit(true);
        decoder.add_bit(true);
        decoder.reset();

        assert_eq!(decoder, BitDecoder::new());
    }

    #[test]
    fn test_seven_then_complete() {
        let mut decoder = BitDecoder::new();
        for _ in 0..7 {
            assert_eq!(decoder.add_bit(false), BitStatus::Accepted);
        }
        assert_eq!(decoder.add_bit(false), BitStatus::Complete);
    }

    #[test]
    fn test_even_parity() {
        let mut decoder = BitDecoder::new();
        // 123 = 0b0111_1011, six ones
        for &bit in &[true, true, false, true, true, true, true, false] {
            decoder.add_bit(bit);
        }

        assert_eq!(decoder.check_parity(false), Ok(()));
        assert_eq!(decoder.check_parity(true), Err(Ps2Error::ParityMismatch));
    }

    #[test]
    fn test_parity_before_ready() {
        let mut decoder = BitDecoder::new();
        decoder.add_bit(true);

        assert_eq!(decoder.check_parity(true), Err(Ps2Error::NotReady));
        assert_eq!(decoder.bit_index(), 1);
    }

    #[test]
    fn test_parity_modes() {
        // 0x07 has three ones
        assert!(ParityMode::Odd.matches(0x07, false));
        assert!(!ParityMode::Odd.matches(0x07, true));
        assert!(ParityMode::Even.matches(0x07, true));
        assert!(ParityMode::Ignore.matches(0x07, false));
    }

    fn frame_bits(byte: u8, parity: ParityMode) -> [bool; 11] {
        let mut bits = [false; 11];
        for i in 0..8 {
            bits[1 + i] = byte & (1 << i) != 0;
        }
        bits[9] = match parity {
            ParityMode::Even => byte.count_ones() % 2 == 1,
            _ => byte.count_ones() % 2 == 0,
        };
        bits[10] = true;
        bits
    }

    fn feed_frame(rx: &mut Ps2Receiver, bits: &[bool]) -> Result<Option<u8>, Ps2Error> {
        let mut last = Ok(None);
        for &bit in bits {
            last = rx.feed(bit);
            if last != Ok(None) {
                break;
            }
        }
        last
    }

    #[test]
    fn test_receiver_full_frame() {
        let mut rx = Ps2Receiver::new(ParityMode::Odd);
        let bits = frame_bits(0x1C, ParityMode::Odd);

        for &bit in &bits[..10] {
            assert_eq!(rx.feed(bit), Ok(None));
        }
        assert!(rx.in_frame());
        assert_eq!(rx.feed(bits[10]), Ok(Some(0x1C)));
        assert!(!rx.in_frame());
    }

    #[test]
    fn test_receiver_back_to_back_frames() {
        let mut rx = Ps2Receiver::new(ParityMode::Even);
        assert_eq!(feed_frame(&mut rx, &frame_bits(0xF0, ParityMode::Even)), Ok(Some(0xF0)));
        assert_eq!(feed_frame(&mut rx, &frame_bits(0x75, ParityMode::Even)), Ok(Some(0x75)));
    }

    #[test]
    fn test_receiver_bad_parity() {
        let mut rx = Ps2Receiver::new(ParityMode::Odd);
        let mut bits = frame_bits(0x29, ParityMode::Odd);
        bits[9] = !bits[9];

        assert_eq!(feed_frame(&mut rx, &bits), Err(Ps2Error::ParityMismatch));
        assert!(!rx.in_frame());
        assert_eq!(
            feed_frame(&mut rx, &frame_bits(0x29, ParityMode::Odd)),
            Ok(Some(0x29))
        );
    }

    #[test]
    fn test_receiver_bad_start_and_stop() {
        let mut rx = Ps2Receiver::default();
        assert_eq!(rx.feed(true), Err(Ps2Error::BadStartBit));

        let mut bits = frame_bits(0x72, ParityMode::Odd);
        bits[10] = false;
        assert_eq!(feed_frame(&mut rx, &bits), Err(Ps2Error::BadStopBit));
    }

    #[test]
    fn test_receiver_reset_mid_frame() {
        let mut rx = Ps2Receiver::default();
        let bits = frame_bits(0x5A, ParityMode::Odd);
        for &bit in &bits[..5] {
            rx.feed(bit).unwrap();
        }
        rx.reset();

        assert!(!rx.in_frame());
        assert_eq!(feed_frame(&mut rx, &bits), Ok(Some(0x5A)));
    }
}
