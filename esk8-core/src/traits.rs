//! Output traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

/// Trait for the throttle signal towards the ESC
///
/// Implementations drive the ESC input, typically a PWM channel. Timer and
/// channel setup belong to the implementation.
pub trait ThrottleOutput {
    /// Apply a throttle level, 0 = idle, 255 = full
    fn set_throttle(&mut self, level: u8);

    /// Last level applied
    fn throttle(&self) -> u8;
}
