//! RP2040-specific HAL for the esk8 controller firmware
//!
//! This crate provides RP2040 implementations of the shared `esk8-hal`
//! traits:
//!
//! - Flash storage driver (implements `esk8_hal::FlashStorage`)
//! - Remote data line input (implements `esk8_hal::InputPin`)
//! - Bus transmitter over any blocking `embedded_io::Write` (implements
//!   `esk8_hal::UartTx`) and UART config conversion

#![no_std]

pub mod flash;
pub mod gpio;
pub mod uart;

// Re-export shared traits from esk8-hal for convenience
pub use esk8_hal::{FlashStorage as FlashStorageTrait, InputPin, StorageKey, UartTx};
