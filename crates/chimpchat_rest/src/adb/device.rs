//! Device control over adb for a single connected device

use crate::capability::{is_property_name, DeviceControl, Screenshot};
use crate::config::TIMING_CONFIG;
use crate::error::{DeviceError, Result};
use phf::phf_map;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::connection::{combined_output, AdbConnection};
use super::{input, screenshot};

/// How a well-known device variable is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarSource {
    /// Read from a system property
    Prop(&'static str),
    DisplayWidth,
    DisplayHeight,
    DisplayDensity,
    /// Milliseconds since boot
    Uptime,
    /// Package of the focused window
    CurrentPackage,
}

/// Device variable names and where their values come from
static DEVICE_VARS: phf::Map<&'static str, VarSource> = phf_map! {
    "build.board" => VarSource::Prop("ro.product.board"),
    "build.brand" => VarSource::Prop("ro.product.brand"),
    "build.device" => VarSource::Prop("ro.product.device"),
    "build.fingerprint" => VarSource::Prop("ro.build.fingerprint"),
    "build.host" => VarSource::Prop("ro.build.host"),
    "build.ID" => VarSource::Prop("ro.build.id"),
    "build.model" => VarSource::Prop("ro.product.model"),
    "build.product" => VarSource::Prop("ro.product.name"),
    "build.tags" => VarSource::Prop("ro.build.tags"),
    "build.type" => VarSource::Prop("ro.build.type"),
    "build.user" => VarSource::Prop("ro.build.user"),
    "build.CPU_ABI" => VarSource::Prop("ro.product.cpu.abi"),
    "build.manufacturer" => VarSource::Prop("ro.product.manufacturer"),
    "build.version.incremental" => VarSource::Prop("ro.build.version.incremental"),
    "build.version.release" => VarSource::Prop("ro.build.version.release"),
    "build.version.sdk" => VarSource::Prop("ro.build.version.sdk"),
    "build.version.codename" => VarSource::Prop("ro.build.version.codename"),
    "display.width" => VarSource::DisplayWidth,
    "display.height" => VarSource::DisplayHeight,
    "display.density" => VarSource::DisplayDensity,
    "clock.realtime" => VarSource::Uptime,
    "clock.uptime" => VarSource::Uptime,
    "am.current.package" => VarSource::CurrentPackage,
};

/// A device bound to one serial number
#[derive(Debug, Clone)]
pub struct AdbDevice {
    conn: AdbConnection,
    serial: String,
}

impl AdbDevice {
    pub fn new(conn: AdbConnection, serial: impl Into<String>) -> Self {
        Self {
            conn,
            serial: serial.into(),
        }
    }

    pub(crate) fn command(&self) -> Command {
        self.conn.command(Some(&self.serial))
    }

    pub(crate) fn shell<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = self.command();
        cmd.arg("shell").args(args);
        cmd
    }

    /// Run a command and fail unless it exits successfully
    pub(crate) async fn run_checked(
        &self,
        cmd: Command,
        timeout: Duration,
        what: &str,
    ) -> Result<String> {
        let output = self.conn.output(cmd, timeout, what).await?;
        let text = combined_output(&output);
        if output.status.success() {
            Ok(text)
        } else {
            Err(DeviceError::CommandFailed(format!("{}: {}", what, text)))
        }
    }

    /// Run a shell command and return its trimmed stdout
    async fn shell_stdout(&self, args: &[&str], what: &str) -> Result<String> {
        let output = self
            .conn
            .output(self.shell(args), TIMING_CONFIG.command_timeout(), what)
            .await?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed(format!(
                "{}: {}",
                what,
                combined_output(&output)
            )));
        }
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    async fn resolve_var(&self, source: VarSource) -> Result<String> {
        match source {
            VarSource::Prop(prop) => self.get_system_property(prop).await,
            VarSource::DisplayWidth | VarSource::DisplayHeight => {
                let out = self.shell_stdout(&["wm", "size"], "wm size").await?;
                let (width, height) = parse_display_size(&out)?;
                let value = if source == VarSource::DisplayWidth {
                    width
                } else {
                    height
                };
                Ok(value.to_string())
            }
            VarSource::DisplayDensity => {
                let out = self.shell_stdout(&["wm", "density"], "wm density").await?;
                Ok(parse_display_density(&out)?.to_string())
            }
            VarSource::Uptime => {
                let out = self
                    .shell_stdout(&["cat", "/proc/uptime"], "read uptime")
                    .await?;
                Ok(parse_proc_uptime(&out)?.to_string())
            }
            VarSource::CurrentPackage => {
                let out = self
                    .shell_stdout(&["dumpsys", "window", "windows"], "dumpsys window")
                    .await?;
                Ok(parse_focused_package(&out).unwrap_or_default())
            }
        }
    }
}

impl DeviceControl for AdbDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    async fn reboot(&self, mode: Option<&str>) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("reboot");
        if let Some(mode) = mode {
            cmd.arg(mode);
        }
        self.run_checked(cmd, TIMING_CONFIG.command_timeout(), "reboot")
            .await?;
        Ok(())
    }

    async fn wake(&self) -> Result<()> {
        self.run_checked(
            self.shell(["input", "keyevent", "KEYCODE_WAKEUP"]),
            TIMING_CONFIG.command_timeout(),
            "wake",
        )
        .await?;
        Ok(())
    }

    async fn install_package(&self, path: &Path) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("install").arg("-r").arg(path);

        let output = self
            .conn
            .output(cmd, TIMING_CONFIG.install_timeout(), "install")
            .await?;
        let text = combined_output(&output);
        debug!("adb install output: {}", text);

        // adb exits 0 on some failures, the verdict is in the output
        if output.status.success() && text.contains("Success") {
            Ok(())
        } else {
            Err(DeviceError::CommandFailed(format!(
                "install {}: {}",
                path.display(),
                text
            )))
        }
    }

    async fn remove_package(&self, name: &str) -> Result<bool> {
        let mut cmd = self.command();
        cmd.arg("uninstall").arg(name);

        let output = self
            .conn
            .output(cmd, TIMING_CONFIG.install_timeout(), "uninstall")
            .await?;
        let text = combined_output(&output);
        let removed = text.contains("Success");
        if !removed {
            warn!("Uninstall of {} did not succeed: {}", name, text);
        }
        Ok(removed)
    }

    async fn get_bootloader_var(&self, name: &str) -> Result<String> {
        match DEVICE_VARS.get(name) {
            Some(source) => self.resolve_var(*source).await,
            None => self.get_system_property(name).await,
        }
    }

    async fn get_system_property(&self, name: &str) -> Result<String> {
        // adb joins shell arguments into one line for the device's sh
        if !is_property_name(name) {
            return Err(DeviceError::InvalidArgument(format!(
                "property name '{}'",
                name
            )));
        }
        self.shell_stdout(&["getprop", name], "getprop").await
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        input::type_text(self, text).await
    }

    async fn capture_screenshot(&self) -> Result<Screenshot> {
        screenshot::capture(self).await
    }
}

/// Parse `wm size`, preferring an override size over the physical one
fn parse_display_size(out: &str) -> Result<(u32, u32)> {
    let re = Regex::new(r"(Physical|Override) size:\s*(\d+)x(\d+)")
        .map_err(|e| DeviceError::ParseError(e.to_string()))?;

    let mut size = None;
    for caps in re.captures_iter(out) {
        let parsed = (caps[2].parse::<u32>(), caps[3].parse::<u32>());
        if let (Ok(w), Ok(h)) = parsed {
            if size.is_none() || &caps[1] == "Override" {
                size = Some((w, h));
            }
        }
    }

    size.ok_or_else(|| DeviceError::ParseError(format!("unexpected wm size output: {}", out)))
}

/// Parse `wm density`, preferring an override density over the physical one
fn parse_display_density(out: &str) -> Result<u32> {
    let re = Regex::new(r"(Physical|Override) density:\s*(\d+)")
        .map_err(|e| DeviceError::ParseError(e.to_string()))?;

    let mut density = None;
    for caps in re.captures_iter(out) {
        if let Ok(d) = caps[2].parse::<u32>() {
            if density.is_none() || &caps[1] == "Override" {
                density = Some(d);
            }
        }
    }

    density
        .ok_or_else(|| DeviceError::ParseError(format!("unexpected wm density output: {}", out)))
}

/// Milliseconds since boot from the first field of `/proc/uptime`
fn parse_proc_uptime(out: &str) -> Result<u64> {
    let secs: f64 = out
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DeviceError::ParseError(format!("unexpected /proc/uptime: {}", out)))?;
    Ok((secs * 1000.0).round() as u64)
}

/// Extract the package of the focused window from `dumpsys window windows`
fn parse_focused_package(out: &str) -> Option<String> {
    let re = Regex::new(r"mCurrentFocus=Window\{\S+ \S+ ([A-Za-z0-9_.]+)/").ok()?;
    re.captures(out).map(|caps| caps[1].to_string())
}
