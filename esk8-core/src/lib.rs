//! Board-agnostic core logic for the controller firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Bus request scheduling and frame transmission
//! - BMS telemetry decoding
//! - Remote input decoding and throttle state
//! - Bluetooth client app registry (pure state, no radio)
//! - Settings types and persistence
//! - Output traits implemented by the firmware

#![no_std]
#![deny(unsafe_code)]

pub mod ble;
pub mod bus;
pub mod config;
pub mod input;
pub mod remote;
pub mod telemetry;
pub mod traits;
