//! Vehicle Bus and Remote Line Protocols
//!
//! This crate holds the wire layer of the controller: the framed message
//! codec spoken on the ESC/BMS serial bus, and the bit-stream decoder for
//! the PS/2-style remote peripheral line.
//!
//! # Bus Frame
//!
//! ```text
//! ┌──────────┬─────┬─────┬─────┬─────┬─────┬─────────────┬──────────┐
//! │ 5A A5    │ LEN │ SRC │ DST │ CMD │ ARG │ PAYLOAD     │ CHECKSUM │
//! │ 2B       │ 1B  │ 1B  │ 1B  │ 1B  │ 1B  │ LEN bytes   │ 2B       │
//! └──────────┴─────┴─────┴─────┴─────┴─────┴─────────────┴──────────┘
//! ```
//!
//! The checksum covers `LEN` through the end of the payload.
//!
//! # Remote Line
//!
//! Bits arrive one per clock edge, least significant bit first. See
//! [`ps2::BitDecoder`] for the byte accumulator and [`ps2::Ps2Receiver`]
//! for the full start/data/parity/stop framing.

#![no_std]
#![deny(unsafe_code)]

pub mod accumulator;
pub mod checksum;
pub mod frame;
pub mod ps2;
pub mod registers;

pub use accumulator::FrameAccumulator;
pub use checksum::{ChecksumAlgorithm, SumComplement, CHECKSUM_SIZE};
pub use frame::{
    find_header, parse, parse_with, FrameError, Message, FRAME_HEADER, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE,
};
pub use ps2::{BitDecoder, BitStatus, ParityMode, Ps2Error, Ps2Receiver};
pub use registers::{read_register, Address, Command, Register};
