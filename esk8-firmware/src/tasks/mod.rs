//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod bus_poll;
pub mod bus_rx;
pub mod ps2;
pub mod remote;

pub use bus_poll::bus_poll_task;
pub use bus_rx::bus_rx_task;
pub use ps2::ps2_task;
pub use remote::{remote_task, PwmThrottle};
