//! Receive-side buffering for the bus
//!
//! A frame may arrive split across several UART reads, possibly behind line
//! noise. [`FrameAccumulator`] collects the chunks and hands out complete
//! messages, discarding bytes that can never become part of a frame.

use heapless::Vec;

use crate::checksum::SumComplement;
use crate::frame::{FrameError, Message, FRAME_HEADER, MIN_FRAME_SIZE};

/// Room for two maximum-length frames as declared by the LENGTH byte
pub const ACCUMULATOR_CAPACITY: usize = 2 * (MIN_FRAME_SIZE + u8::MAX as usize);

/// Byte buffer that resynchronizes on the frame marker
#[derive(Debug, Clone, Default)]
pub struct FrameAccumulator {
    buffer: Vec<u8, ACCUMULATOR_CAPACITY>,
}

impl FrameAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Bytes currently held
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Append a received chunk
    ///
    /// When the buffer would overflow, the oldest bytes are dropped. Returns
    /// how many bytes were lost that way.
    pub fn push(&mut self, chunk: &[u8]) -> usize {
        let mut dropped = 0;

        let chunk = if chunk.len() > ACCUMULATOR_CAPACITY {
            dropped += chunk.len() - ACCUMULATOR_CAPACITY;
            &chunk[chunk.len() - ACCUMULATOR_CAPACITY..]
        } else {
            chunk
        };

        let overflow = (self.buffer.len() + chunk.len()).saturating_sub(ACCUMULATOR_CAPACITY);
        self.discard(overflow);
        dropped += overflow;

        // Room was made above
        let _ = self.buffer.extend_from_slice(chunk);

        dropped
    }

    /// Take the next complete message out of the buffer
    ///
    /// `Ok(None)` means more bytes are needed. A corrupt frame is dropped
    /// from the buffer before its error is returned, so calling again moves
    /// on to whatever follows it.
    pub fn next_message(&mut self) -> Result<Option<Message>, FrameError> {
        match Message::decode::<SumComplement>(&self.buffer) {
            Ok((msg, end)) => {
                self.discard(end);
                Ok(Some(msg))
            }
            Err(FrameError::NoHeader) => {
                // Keep a trailing first marker byte; its partner may be in flight
                let keep = usize::from(self.buffer.last() == Some(&FRAME_HEADER[0]));
                self.discard(self.buffer.len() - keep);
                Ok(None)
            }
            Err(FrameError::Truncated) => {
                self.drop_garbage();
                Ok(None)
            }
            Err(e) => {
                self.drop_garbage();
                self.discard(FRAME_HEADER.len());
                Err(e)
            }
        }
    }

    /// Discard everything before the first marker
    fn drop_garbage(&mut self) {
        if let Some(start) = crate::frame::find_header(&self.buffer) {
            self.discard(start);
        }
    }

    fn discard(&mut self, count: usize) {
        let count = count.min(self.buffer.len());
        if count == 0 {
            return;
        }
        self.buffer.copy_within(count.., 0);
        let remaining = self.buffer.len() - count;
        self.buffer.truncate(remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{read_register, Address, Register};

    fn frame() -> heapless::Vec<u8, { crate::frame::MAX_FRAME_SIZE }> {
        read_register(Address::Bms, Register::Voltage, 2)
            .unwrap()
            .encode_to_vec()
            .unwrap()
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let encoded = frame();
        let mut acc = FrameAccumulator::new();

        acc.push(&encoded[..4]);
        assert_eq!(acc.next_message(), Ok(None));
        acc.push(&encoded[4..]);

        let msg = acc.next_message().unwrap().unwrap();
        assert_eq!(msg.argument, 0x34);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let encoded = frame();
        let mut acc = FrameAccumulator::new();
        acc.push(&encoded);
        acc.push(&encoded);

        assert!(acc.next_message().unwrap().is_some());
        assert!(acc.next_message().unwrap().is_some());
        assert_eq!(acc.next_message(), Ok(None));
    }

    #[test]
    fn test_garbage_without_header_is_dropped() {
        let mut acc = FrameAccumulator::new();
        acc.push(&[0x01, 0x02, 0x03]);

        assert_eq!(acc.next_message(), Ok(None));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_trailing_marker_byte_is_kept() {
        let encoded = frame();
        let mut acc = FrameAccumulator::new();
        acc.push(&[0x01, 0x02, encoded[0]]);

        assert_eq!(acc.next_message(), Ok(None));
        assert_eq!(acc.len(), 1);

        acc.push(&encoded[1..]);
        assert!(acc.next_message().unwrap().is_some());
    }

    #[test]
    fn test_resync_after_corrupt_frame() {
        let mut corrupt = frame();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;

        let mut acc = FrameAccumulator::new();
        acc.push(&[0x00, 0x11]);
        acc.push(&corrupt);
        acc.push(&frame());

        assert_eq!(acc.next_message(), Err(FrameError::ChecksumMismatch));
        let msg = acc.next_message().unwrap().unwrap();
        assert_eq!(msg.dst_address, 0x22);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut acc = FrameAccumulator::new();
        let noise = [0u8; ACCUMULATOR_CAPACITY];

        assert_eq!(acc.push(&noise), 0);
        let encoded = frame();
        assert_eq!(acc.push(&encoded), encoded.len());
        assert_eq!(acc.len(), ACCUMULATOR_CAPACITY);

        assert!(acc.next_message().unwrap().is_some());
    }

    #[test]
    fn test_oversized_chunk_keeps_tail() {
        let mut acc = FrameAccumulator::new();
        let noise = [0u8; ACCUMULATOR_CAPACITY + 5];

        assert_eq!(acc.push(&noise), 5);
        assert_eq!(acc.len(), ACCUMULATOR_CAPACITY);
    }
}
