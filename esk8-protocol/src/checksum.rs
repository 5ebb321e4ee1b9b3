//! Frame integrity codes
//!
//! The bus checksum is isolated behind [`ChecksumAlgorithm`] so the codec
//! can be pointed at a different routine without touching the framing.
//!
//! The default, [`SumComplement`], is the 16-bit one's complement of the
//! byte sum, sent little-endian. This is the convention used by scooter
//! buses carrying the `5A A5` marker; confirm it against the attached
//! hardware before relying on wire compatibility.

/// Size of the checksum field in bytes
pub const CHECKSUM_SIZE: usize = 2;

/// Incremental checksum routine
///
/// Mirrors the `Hasher` pattern: feed data with [`update`](Self::update),
/// read the 2-byte code with [`finish`](Self::finish).
pub trait ChecksumAlgorithm: Default {
    /// Fold more bytes into the running code
    fn update(&mut self, data: &[u8]);

    /// Wire representation of the code for everything fed so far
    fn finish(&self) -> [u8; CHECKSUM_SIZE];

    /// One-shot computation over a single buffer
    fn compute(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
        let mut algo = Self::default();
        algo.update(data);
        algo.finish()
    }
}

/// Inverted 16-bit byte sum, little-endian on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SumComplement {
    sum: u16,
}

impl ChecksumAlgorithm for SumComplement {
    fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.sum = self.sum.wrapping_add(byte as u16);
        }
    }

    fn finish(&self) -> [u8; CHECKSUM_SIZE] {
        (!self.sum).to_le_bytes()
    }
}

/// Compute the default bus checksum over an arbitrary byte range
pub fn compute(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    SumComplement::compute(data)
}
