//! Message encoding and decoding for the vehicle bus.
//!
//! Frame format:
//! - HEADER (2 bytes): `0x5A 0xA5` synchronization marker
//! - LENGTH (1 byte): payload length
//! - SRC (1 byte): sender bus address
//! - DST (1 byte): receiver bus address
//! - CMD (1 byte): opcode
//! - ARG (1 byte): opcode parameter (register id for register access)
//! - PAYLOAD (LENGTH bytes): opcode-specific data
//! - CHECKSUM (2 bytes): see [`crate::checksum`], over LENGTH..=PAYLOAD

use heapless::Vec;

use crate::checksum::{ChecksumAlgorithm, SumComplement, CHECKSUM_SIZE};

/// Frame synchronization marker
pub const FRAME_HEADER: [u8; 2] = [0x5A, 0xA5];

/// Number of single-byte fields between the marker and the payload
pub const HEADER_FIELDS_SIZE: usize = 5;

/// Smallest valid frame: marker, header fields and checksum, empty payload
pub const MIN_FRAME_SIZE: usize = FRAME_HEADER.len() + HEADER_FIELDS_SIZE + CHECKSUM_SIZE;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = MIN_FRAME_SIZE + MAX_PAYLOAD_SIZE;

const LENGTH_OFFSET: usize = 2;
const SRC_OFFSET: usize = 3;
const DST_OFFSET: usize = 4;
const CMD_OFFSET: usize = 5;
const ARG_OFFSET: usize = 6;
const PAYLOAD_OFFSET: usize = 7;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No synchronization marker in the buffer
    NoHeader,
    /// Frame is incomplete (need more bytes)
    Truncated,
    /// Checksum mismatch
    ChecksumMismatch,
    /// Payload does not fit the owned payload buffer
    PayloadTooLarge,
    /// Invalid argument to a message builder
    InvalidParam,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Locate the first synchronization marker in `buffer`
///
/// Returns the offset of the `0x5A` byte. A trailing `0x5A` with nothing
/// after it is not a match; the caller has to supply more bytes first.
pub fn find_header(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_HEADER.len())
        .position(|window| *window == FRAME_HEADER)
}

/// A parsed or constructed bus message
///
/// The payload is always owned. Parsing copies it out of the source buffer,
/// so a `Message` never borrows receive memory.
///
/// The checksum is a stored field, not derived: it is verified when parsing,
/// but after building or editing a message it must be refreshed with
/// [`set_checksum`](Self::set_checksum) before [`serialize`](Self::serialize).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// Sender bus address
    pub src_address: u8,
    /// Receiver bus address
    pub dst_address: u8,
    /// Opcode
    pub command: u8,
    /// Opcode-specific parameter
    pub argument: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    /// Stored checksum, written verbatim by `serialize`
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl Message {
    /// Create a new message with a zeroed checksum
    pub fn new(
        src_address: u8,
        dst_address: u8,
        command: u8,
        argument: u8,
        payload: &[u8],
    ) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            src_address,
            dst_address,
            command,
            argument,
            payload,
            checksum: [0; CHECKSUM_SIZE],
        })
    }

    /// Value of the LENGTH field
    pub fn payload_length(&self) -> u8 {
        // MAX_PAYLOAD_SIZE fits in a u8
        self.payload.len() as u8
    }

    fn header_fields(&self) -> [u8; HEADER_FIELDS_SIZE] {
        [
            self.payload_length(),
            self.src_address,
            self.dst_address,
            self.command,
            self.argument,
        ]
    }

    /// Checksum of the current header fields and payload
    pub fn compute_checksum<C: ChecksumAlgorithm>(&self) -> [u8; CHECKSUM_SIZE] {
        let mut algo = C::default();
        algo.update(&self.header_fields());
        algo.update(&self.payload);
        algo.finish()
    }

    /// Overwrite the stored checksum from the current contents
    pub fn set_checksum(&mut self) {
        self.set_checksum_with::<SumComplement>();
    }

    /// [`set_checksum`](Self::set_checksum) with an explicit algorithm
    pub fn set_checksum_with<C: ChecksumAlgorithm>(&mut self) {
        self.checksum = self.compute_checksum::<C>();
    }

    /// Check the stored checksum against the current contents
    pub fn verify(&self) -> Result<(), FrameError> {
        if self.checksum == self.compute_checksum::<SumComplement>() {
            Ok(())
        } else {
            Err(FrameError::ChecksumMismatch)
        }
    }

    /// Number of bytes `serialize` writes
    pub fn serialized_length(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }

    /// Encode this message into a byte buffer
    ///
    /// The stored checksum is written as-is. Returns the number of bytes
    /// written.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.serialized_length();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let payload_end = PAYLOAD_OFFSET + self.payload.len();

        buffer[..LENGTH_OFFSET].copy_from_slice(&FRAME_HEADER);
        buffer[LENGTH_OFFSET..PAYLOAD_OFFSET].copy_from_slice(&self.header_fields());
        buffer[PAYLOAD_OFFSET..payload_end].copy_from_slice(&self.payload);
        buffer[payload_end..frame_len].copy_from_slice(&self.checksum);

        Ok(frame_len)
    }

    /// Encode this message into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.serialize(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decode the first frame in `buffer`
    ///
    /// On success returns the message and the offset one past the end of
    /// the frame within `buffer`, so callers can drop what was consumed.
    pub fn decode<C: ChecksumAlgorithm>(buffer: &[u8]) -> Result<(Self, usize), FrameError> {
        let start = find_header(buffer).ok_or(FrameError::NoHeader)?;
        let frame = &buffer[start..];

        if frame.len() < MIN_FRAME_SIZE {
            return Err(FrameError::Truncated);
        }

        let payload_len = frame[LENGTH_OFFSET] as usize;
        let frame_len = MIN_FRAME_SIZE + payload_len;
        if frame.len() < frame_len {
            return Err(FrameError::Truncated);
        }

        let payload_end = PAYLOAD_OFFSET + payload_len;
        let checksum = [frame[payload_end], frame[payload_end + 1]];

        if C::compute(&frame[LENGTH_OFFSET..payload_end]) != checksum {
            return Err(FrameError::ChecksumMismatch);
        }

        // Payload is copied only once the checksum matched
        let payload = Vec::from_slice(&frame[PAYLOAD_OFFSET..payload_end])
            .map_err(|_| FrameError::PayloadTooLarge)?;

        let msg = Self {
            src_address: frame[SRC_OFFSET],
            dst_address: frame[DST_OFFSET],
            command: frame[CMD_OFFSET],
            argument: frame[ARG_OFFSET],
            payload,
            checksum,
        };

        Ok((msg, start + frame_len))
    }
}

/// Parse the first valid frame in `buffer` using the default checksum
pub fn parse(buffer: &[u8]) -> Result<Message, FrameError> {
    parse_with::<SumComplement>(buffer)
}

/// Parse the first valid frame in `buffer` using checksum `C`
pub fn parse_with<C: ChecksumAlgorithm>(buffer: &[u8]) -> Result<Message, FrameError> {
    Message::decode::<C>(buffer).map(|(msg, _)| msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        let mut msg = Message::new(0x21, 0x22, 0x01, 0x34, &[0x02]).unwrap();
        msg.set_checksum();
        msg
    }

    #[test]
    fn test_find_header_absent() {
        assert_eq!(find_header(&[]), None);
        assert_eq!(find_header(&[0x00, 0xA5, 0x5A]), None);
    }

    #[test]
    fn test_find_header_after_garbage() {
        assert_eq!(find_header(&[0x00, 0xFF, 0x5A, 0xA5, 0x01]), Some(2));
        assert_eq!(find_header(&[0x5A, 0x5A, 0xA5]), Some(1));
    }

    #[test]
    fn test_find_header_trailing_marker_byte() {
        assert_eq!(find_header(&[0x12, 0x5A]), None);
    }

    #[test]
    fn test_serialize_layout() {
        let msg = sample();
        let mut buffer = [0u8; 16];
        let len = msg.serialize(&mut buffer).unwrap();

        assert_eq!(len, 10);
        assert_eq!(
            &buffer[..len],
            &[0x5A, 0xA5, 0x01, 0x21, 0x22, 0x01, 0x34, 0x02, 0x84, 0xFF]
        );
    }

    #[test]
    fn test_serialize_empty_payload() {
        let mut msg = Message::new(0x3E, 0x20, 0x05, 0x10, &[]).unwrap();
        msg.set_checksum();
        let encoded = msg.encode_to_vec().unwrap();

        assert_eq!(encoded.len(), MIN_FRAME_SIZE);
        assert_eq!(msg.serialized_length(), MIN_FRAME_SIZE);
        assert_eq!(parse(&encoded).unwrap(), msg);
    }

    #[test]
    fn test_serialize_writes_stored_checksum() {
        let mut msg = Message::new(0x21, 0x20, 0x01, 0x34, &[0x02]).unwrap();
        msg.checksum = [0xAB, 0xCD];
        let encoded = msg.encode_to_vec().unwrap();

        assert_eq!(&encoded[encoded.len() - 2..], &[0xAB, 0xCD]);
        assert_eq!(parse(&encoded), Err(FrameError::ChecksumMismatch));
    }

    #[test]
    fn test_serialize_buffer_too_small() {
        let msg = sample();
        let mut buffer = [0u8; 9];
        assert_eq!(msg.serialize(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_parse_roundtrip() {
        let msg = sample();
        let encoded = msg.encode_to_vec().unwrap();
        let parsed = parse(&encoded).unwrap();

        assert_eq!(parsed, msg);
        assert_eq!(parsed.payload_length(), 1);
    }

    #[test]
    fn test_parse_skips_leading_garbage() {
        let encoded = sample().encode_to_vec().unwrap();
        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[0x00, 0x5A, 0x13, 0xA5]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let (parsed, end) = Message::decode::<SumComplement>(&data).unwrap();
        assert_eq!(parsed, sample());
        assert_eq!(end, data.len());
    }

    #[test]
    fn test_parse_no_header() {
        assert_eq!(parse(&[0x01, 0x02, 0x03]), Err(FrameError::NoHeader));
    }

    #[test]
    fn test_parse_short_of_minimum() {
        assert_eq!(
            parse(&[0x5A, 0xA5, 0x00, 0x21, 0x20]),
            Err(FrameError::Truncated)
        );
    }

    #[test]
    fn test_parse_missing_payload_bytes() {
        let encoded = sample().encode_to_vec().unwrap();
        assert_eq!(
            parse(&encoded[..encoded.len() - 1]),
            Err(FrameError::Truncated)
        );
    }

    #[test]
    fn test_parse_invalid_checksum() {
        let mut encoded = sample().encode_to_vec().unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        assert_eq!(parse(&encoded), Err(FrameError::ChecksumMismatch));
    }

    #[test]
    fn test_parse_oversized_length_field() {
        // LENGTH=255 is representable on the wire but exceeds the payload buffer
        let mut data = [0u8; MIN_FRAME_SIZE + 255];
        data[..2].copy_from_slice(&FRAME_HEADER);
        data[2] = 255;
        let end = data.len() - 2;
        let checksum = SumComplement::compute(&data[2..end]);
        data[end..].copy_from_slice(&checksum);

        assert_eq!(parse(&data), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Message::new(0x21, 0x20, 0x01, 0x00, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_verify_tracks_edits() {
        let mut msg = sample();
        assert_eq!(msg.verify(), Ok(()));

        msg.argument = 0x35;
        assert_eq!(msg.verify(), Err(FrameError::ChecksumMismatch));

        msg.set_checksum();
        assert_eq!(msg.verify(), Ok(()));
    }

    #[derive(Default)]
    struct XorFold {
        acc: [u8; 2],
        odd: bool,
    }

    impl ChecksumAlgorithm for XorFold {
        fn update(&mut self, data: &[u8]) {
            for &byte in data {
                self.acc[self.odd as usize] ^= byte;
                self.odd = !self.odd;
            }
        }

        fn finish(&self) -> [u8; CHECKSUM_SIZE] {
            self.acc
        }
    }

    #[test]
    fn test_swappable_algorithm() {
        let mut msg = Message::new(0x21, 0x20, 0x01, 0x34, &[0x02, 0x07]).unwrap();
        msg.set_checksum_with::<XorFold>();
        let encoded = msg.encode_to_vec().unwrap();

        assert_eq!(parse_with::<XorFold>(&encoded).unwrap(), msg);
        assert_eq!(parse(&encoded), Err(FrameError::ChecksumMismatch));
    }
}
