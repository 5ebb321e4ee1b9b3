//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use esk8_core::input::KeyAction;
use esk8_core::telemetry::Telemetry;

/// Channel capacity for remote events
const REMOTE_CHANNEL_SIZE: usize = 8;

/// Events from the remote line to the remote task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteEvent {
    /// Remote passed its power-on self test
    Attached,
    /// Remote line stopped producing valid frames
    Detached,
    /// Key pressed
    Key(KeyAction),
}

/// Remote line events, produced by the PS/2 task
pub static REMOTE_CHANNEL: Channel<CriticalSectionRawMutex, RemoteEvent, REMOTE_CHANNEL_SIZE> =
    Channel::new();

/// Latest BMS state, updated by the bus RX task
pub static TELEMETRY: Mutex<CriticalSectionRawMutex, Telemetry> = Mutex::new(Telemetry::EMPTY);

/// Throttle level currently applied (for logging)
pub static THROTTLE_LEVEL: Signal<CriticalSectionRawMutex, u8> = Signal::new();
