//! esk8 Hardware Abstraction Layer
//!
//! This crate defines the narrow interfaces through which the board-agnostic
//! crates reach the hardware. Chip-specific HALs implement them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (esk8-firmware, esk8-core) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  esk8-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ esk8-hal-     │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::InputPin`] - Remote line sampling
//! - [`uart::UartTx`] - Vehicle bus transmitter
//! - [`flash::FlashStorage`] - Settings persistence

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod gpio;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use flash::{FlashError, FlashStorage, StorageKey};
pub use gpio::InputPin;
pub use uart::{UartConfig, UartTx};
