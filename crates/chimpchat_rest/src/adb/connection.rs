//! ADB connection management: command construction, device listing and
//! waiting for a device to come online

use crate::capability::DeviceConnector;
use crate::config::TIMING_CONFIG;
use crate::error::{DeviceError, Result};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info};

use super::device::AdbDevice;

/// State reported by `adb devices` for a usable device
const READY_STATE: &str = "device";

/// Information about a device listed by `adb devices -l`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub status: String,
    pub model: Option<String>,
}

impl DeviceInfo {
    pub fn is_ready(&self) -> bool {
        self.status == READY_STATE
    }
}

/// Runs `adb` commands, optionally targeted at one device
#[derive(Debug, Clone)]
pub struct AdbConnection {
    adb_path: String,
}

impl AdbConnection {
    /// Create a connection manager using `adb` from `PATH`
    pub fn new() -> Self {
        Self {
            adb_path: "adb".to_string(),
        }
    }

    /// Create a connection manager with a custom ADB path
    pub fn with_path(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }

    /// Build an `adb` command with the `-s <serial>` prefix when a serial is given
    pub(crate) fn command(&self, serial: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run a prepared command, failing with `Timeout` after `timeout`
    pub(crate) async fn output(
        &self,
        mut cmd: Command,
        timeout: Duration,
        what: &str,
    ) -> Result<Output> {
        debug!("Running adb command: {:?}", cmd.as_std());

        tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                DeviceError::Timeout(format!("{} timeout after {:.1}s", what, timeout.as_secs_f64()))
            })?
            .map_err(DeviceError::Io)
    }

    /// List all devices known to the adb server
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut cmd = self.command(None);
        cmd.arg("devices").arg("-l");

        let output = self
            .output(cmd, TIMING_CONFIG.command_timeout(), "List devices")
            .await?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed(combined_output(&output)));
        }

        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Poll the device list until a ready device shows up.
    ///
    /// With a serial only that device is accepted. The list is checked at
    /// least once, even for a zero timeout.
    pub async fn wait_for_device(
        &self,
        timeout: Duration,
        serial: Option<&str>,
    ) -> Result<DeviceInfo> {
        let deadline = Instant::now() + timeout;

        loop {
            let devices = self.list_devices().await?;
            let mut candidates = devices
                .iter()
                .filter(|d| serial.map_or(true, |s| d.serial == s));

            if let Some(ready) = candidates.clone().find(|d| d.is_ready()) {
                return Ok(ready.clone());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(match (serial, candidates.next()) {
                    (Some(s), Some(listed)) => DeviceError::Timeout(format!(
                        "device {} is {} after {}ms",
                        s,
                        listed.status,
                        timeout.as_millis()
                    )),
                    (Some(s), None) => DeviceError::DeviceNotFound(s.to_string()),
                    (None, _) => DeviceError::DeviceNotFound(format!(
                        "no device ready after {}ms",
                        timeout.as_millis()
                    )),
                });
            }

            let pause = TIMING_CONFIG.connect_poll_interval().min(deadline - now);
            tokio::time::sleep(pause).await;
        }
    }
}

impl Default for AdbConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceConnector for AdbConnection {
    type Device = AdbDevice;

    async fn connect(&self, timeout: Duration, serial: Option<&str>) -> Result<AdbDevice> {
        let info = self.wait_for_device(timeout, serial).await?;
        info!(
            "Connected to {} ({})",
            info.serial,
            info.model.as_deref().unwrap_or("unknown model")
        );
        Ok(AdbDevice::new(self.clone(), info.serial))
    }
}

/// Stdout followed by stderr, trimmed
pub(crate) fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr).trim().to_string()
}

/// Parse the output of `adb devices -l`
fn parse_devices(stdout: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        // Header, daemon chatter and blank lines
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let model = parts[2..]
            .iter()
            .find_map(|part| part.strip_prefix("model:"))
            .map(|m| m.to_string());

        devices.push(DeviceInfo {
            serial: parts[0].to_string(),
            status: parts[1].to_string(),
            model,
        });
    }

    devices
}
