//! Remote control context
//!
//! Owns the throttle output and the link state towards the handheld
//! remote. There is one explicit `Remote` value, owned by the task that
//! drives the throttle.

use crate::config::ThrottleLimits;
use crate::input::KeyAction;
use crate::traits::ThrottleOutput;

/// Remote link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteState {
    /// Not started
    #[default]
    Stopped,
    /// Started, outputs being brought up
    Init,
    /// Ready, no link to a remote
    NotConnected,
    /// Scanning for the remote
    Searching,
    /// Linked to the remote
    Connected,
}

/// Remote control errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteError {
    /// `start` called on a running remote
    AlreadyStarted,
    /// Operation not allowed in the current state
    BadState(RemoteState),
}

/// Remote control context
pub struct Remote<O> {
    output: O,
    limits: ThrottleLimits,
    state: RemoteState,
    speed: u8,
}

impl<O: ThrottleOutput> Remote<O> {
    /// Create a stopped remote driving `output` within `limits`
    pub fn new(output: O, limits: ThrottleLimits) -> Self {
        let speed = limits.min;
        Self {
            output,
            limits,
            state: RemoteState::Stopped,
            speed,
        }
    }

    /// Begin initialisation and put the throttle at idle
    pub fn start(&mut self) -> Result<(), RemoteError> {
        if self.state != RemoteState::Stopped {
            return Err(RemoteError::AlreadyStarted);
        }

        self.state = RemoteState::Init;
        self.set_speed(self.limits.min);
        Ok(())
    }

    /// Finish initialisation once the inputs are running
    pub fn ready(&mut self) -> Result<(), RemoteError> {
        self.expect_state(RemoteState::Init)?;
        self.state = RemoteState::NotConnected;
        Ok(())
    }

    /// Idle the throttle and return to the stopped state
    pub fn stop(&mut self) {
        self.set_speed(self.limits.min);
        self.state = RemoteState::Stopped;
    }

    /// Start looking for the remote
    pub fn connect(&mut self) -> Result<(), RemoteError> {
        self.expect_state(RemoteState::NotConnected)?;
        self.state = RemoteState::Searching;
        Ok(())
    }

    /// Scan ended without a link
    pub fn on_scan_complete(&mut self) {
        if self.state == RemoteState::Searching {
            self.state = RemoteState::NotConnected;
        }
    }

    /// Link established
    pub fn on_connected(&mut self) -> Result<(), RemoteError> {
        self.expect_state(RemoteState::Searching)?;
        self.state = RemoteState::Connected;
        Ok(())
    }

    /// Link lost; the throttle drops to idle
    pub fn on_disconnected(&mut self) {
        if self.state == RemoteState::Connected {
            self.set_speed(self.limits.min);
            self.state = RemoteState::NotConnected;
        }
    }

    /// Change the throttle by `incr`, clamped to the configured range
    ///
    /// Returns the level now applied.
    pub fn incr_speed(&mut self, incr: i16) -> Result<u8, RemoteError> {
        if matches!(self.state, RemoteState::Stopped | RemoteState::Init) {
            return Err(RemoteError::BadState(self.state));
        }

        let target = (self.speed as i16)
            .saturating_add(incr)
            .clamp(self.limits.min as i16, self.limits.max as i16);
        // Clamped to a u8 range above
        self.set_speed(target as u8);
        Ok(self.speed)
    }

    /// Apply a key press
    pub fn handle_key(&mut self, action: KeyAction) -> Result<u8, RemoteError> {
        let step = self.limits.step as i16;
        match action {
            KeyAction::Accelerate => self.incr_speed(step),
            KeyAction::Brake => self.incr_speed(-step),
            KeyAction::Stop => {
                self.incr_speed(0)?;
                self.set_speed(self.limits.min);
                Ok(self.speed)
            }
        }
    }

    /// Current state
    pub fn state(&self) -> RemoteState {
        self.state
    }

    /// Current throttle level
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Throttle range in use
    pub fn limits(&self) -> ThrottleLimits {
        self.limits
    }

    /// Borrow the throttle output
    pub fn output(&self) -> &O {
        &self.output
    }

    fn set_speed(&mut self, level: u8) {
        self.speed = level;
        self.output.set_throttle(level);
    }

    fn expect_state(&self, expected: RemoteState) -> Result<(), RemoteError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RemoteError::BadState(self.state))
        }
    }
}
