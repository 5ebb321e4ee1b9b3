//! Remote line inputs
//!
//! The clock line stays a plain embassy `Input` so the firmware can await
//! its edges. The data line is wrapped to implement `esk8_hal::InputPin`.

use embassy_rp::gpio::{AnyPin, Input, Pull};
use embassy_rp::Peri;

/// Remote data line
pub struct DataPin<'d> {
    input: Input<'d>,
}

impl<'d> DataPin<'d> {
    /// Configure `pin` as the data input with a pull-up
    ///
    /// The line is open-collector; the pull-up keeps it idle high when the
    /// remote is unplugged.
    pub fn new(pin: Peri<'d, AnyPin>) -> Self {
        Self {
            input: Input::new(pin, Pull::Up),
        }
    }
}

impl esk8_hal::InputPin for DataPin<'_> {
    fn is_high(&self) -> bool {
        self.input.is_high()
    }
}
