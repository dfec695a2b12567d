//! Timing configuration for adb operations

use lazy_static::lazy_static;
use std::env;
use std::time::Duration;

/// Seconds from `name`, or `default` unless the value is a representable duration
fn env_secs(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &f64| Duration::try_from_secs_f64(*v).is_ok())
        .unwrap_or(default)
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// Timeouts and delays used by the adb backend, in seconds
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Delay between `adb devices` polls while waiting for a connection
    pub connect_poll_interval: f64,
    /// Upper bound for short shell commands (getprop, input, reboot)
    pub command_timeout: f64,
    /// Upper bound for `adb install`
    pub install_timeout: f64,
    /// Upper bound for each of `screencap` and `adb pull`
    pub screenshot_timeout: f64,
}

impl TimingConfig {
    pub fn connect_poll_interval(&self) -> Duration {
        secs(self.connect_poll_interval)
    }

    pub fn command_timeout(&self) -> Duration {
        secs(self.command_timeout)
    }

    pub fn install_timeout(&self) -> Duration {
        secs(self.install_timeout)
    }

    pub fn screenshot_timeout(&self) -> Duration {
        secs(self.screenshot_timeout)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_poll_interval: env_secs("CHIMPCHAT_REST_CONNECT_POLL_INTERVAL", 0.2),
            command_timeout: env_secs("CHIMPCHAT_REST_COMMAND_TIMEOUT", 10.0),
            install_timeout: env_secs("CHIMPCHAT_REST_INSTALL_TIMEOUT", 300.0),
            screenshot_timeout: env_secs("CHIMPCHAT_REST_SCREENSHOT_TIMEOUT", 10.0),
        }
    }
}

lazy_static! {
    /// Global timing configuration instance
    pub static ref TIMING_CONFIG: TimingConfig = TimingConfig::default();
}
