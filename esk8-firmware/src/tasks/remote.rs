//! Remote control task
//!
//! Drives the ESC throttle from remote key presses. The ESC takes a
//! standard servo signal: 50 Hz, 1 ms pulse at idle, 2 ms at full throttle.

use defmt::*;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use fixed::traits::ToFixed;

use esk8_core::config::ThrottleLimits;
use esk8_core::remote::{Remote, RemoteState};
use esk8_core::traits::ThrottleOutput;

use crate::channels::{RemoteEvent, REMOTE_CHANNEL, THROTTLE_LEVEL};

/// PWM clock divider: 125 MHz / 64 = 1.953125 MHz
const PWM_DIVIDER: u8 = 64;
/// Counter wrap for a 20 ms period
const PWM_TOP: u16 = 39_062;
/// Counts in a 1 ms pulse
const PULSE_MIN: u32 = 1_953;
/// Counts in a 2 ms pulse
const PULSE_MAX: u32 = 3_906;

/// Servo-style throttle output on PWM channel A
pub struct PwmThrottle {
    pwm: Pwm<'static>,
    config: PwmConfig,
    level: u8,
}

impl PwmThrottle {
    /// Configure the slice for 50 Hz, starting at idle
    pub fn new(mut pwm: Pwm<'static>) -> Self {
        let mut config = PwmConfig::default();
        config.divider = PWM_DIVIDER.to_fixed();
        config.top = PWM_TOP;
        config.compare_a = PULSE_MIN as u16;
        pwm.set_config(&config);

        Self {
            pwm,
            config,
            level: 0,
        }
    }
}

impl ThrottleOutput for PwmThrottle {
    fn set_throttle(&mut self, level: u8) {
        let pulse = PULSE_MIN + (PULSE_MAX - PULSE_MIN) * level as u32 / u8::MAX as u32;
        // PULSE_MAX fits in u16
        self.config.compare_a = pulse as u16;
        self.pwm.set_config(&self.config);
        self.level = level;
    }

    fn throttle(&self) -> u8 {
        self.level
    }
}

/// Remote task - applies remote events to the throttle
#[embassy_executor::task]
pub async fn remote_task(output: PwmThrottle, limits: ThrottleLimits) {
    info!(
        "Remote task started, throttle {}..{} step {}",
        limits.min, limits.max, limits.step
    );

    let mut remote = Remote::new(output, limits);
    if let Err(e) = remote.start() {
        error!("Remote start failed: {:?}", e);
        return;
    }
    if let Err(e) = remote.ready().and_then(|_| remote.connect()) {
        error!("Remote init failed: {:?}", e);
        return;
    }
    info!("Waiting for remote");

    loop {
        let event = REMOTE_CHANNEL.receive().await;
        debug!("Remote event {:?} in {:?}", event, remote.state());

        match event {
            RemoteEvent::Attached => link_up(&mut remote),
            RemoteEvent::Detached => {
                if remote.state() == RemoteState::Connected {
                    warn!("Remote lost, throttle to idle");
                    remote.on_disconnected();
                    THROTTLE_LEVEL.signal(remote.speed());
                }
                if let Err(e) = remote.connect() {
                    debug!("Reconnect skipped: {:?}", e);
                }
            }
            RemoteEvent::Key(action) => {
                // A remote plugged in before boot never sends its self test
                if remote.state() == RemoteState::Searching {
                    link_up(&mut remote);
                }

                match remote.handle_key(action) {
                    Ok(level) => {
                        info!("{:?}: throttle now {}", action, level);
                        THROTTLE_LEVEL.signal(level);
                    }
                    Err(e) => warn!("Key {:?} rejected: {:?}", action, e),
                }
            }
        }
    }
}

fn link_up(remote: &mut Remote<PwmThrottle>) {
    match remote.on_connected() {
        Ok(()) => info!("Remote connected"),
        Err(e) => debug!("Attach ignored: {:?}", e),
    }
}
