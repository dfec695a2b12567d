//! Screenshot capture utilities for Android devices

use crate::capability::Screenshot;
use crate::config::TIMING_CONFIG;
use crate::error::{DeviceError, Result};
use tempfile::tempdir;
use tracing::debug;

use super::device::AdbDevice;

/// Scratch file on the device, removed after the pull
const DEVICE_SCREENSHOT_PATH: &str = "/sdcard/chimpchat-rest-screenshot.png";

/// Capture the screen of a connected device
pub(crate) async fn capture(device: &AdbDevice) -> Result<Screenshot> {
    // The file doesn't exist until adb pull creates it
    let temp_dir = tempdir().map_err(DeviceError::Io)?;
    let temp_path = temp_dir.path().join("screenshot.png");
    let timeout = TIMING_CONFIG.screenshot_timeout();

    let output = device
        .run_checked(
            device.shell(["screencap", "-p", DEVICE_SCREENSHOT_PATH]),
            timeout,
            "screencap",
        )
        .await?;

    debug!("screencap output: {}", output);

    // Secure windows make screencap print a failure while exiting 0
    if output.contains("Status: -1") || output.contains("Failed") {
        return Err(DeviceError::CommandFailed(format!(
            "screencap refused: {}",
            output
        )));
    }

    let mut cmd = device.command();
    cmd.arg("pull").arg(DEVICE_SCREENSHOT_PATH).arg(&temp_path);
    let pulled = device.run_checked(cmd, timeout, "adb pull").await;

    // Best effort, a stale scratch file is overwritten next time
    let _ = device
        .run_checked(
            device.shell(["rm", "-f", DEVICE_SCREENSHOT_PATH]),
            timeout,
            "remove scratch screenshot",
        )
        .await;

    let pull_output = pulled?;
    debug!("adb pull output: {}", pull_output);

    let file_size = tokio::fs::metadata(&temp_path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    if file_size == 0 {
        return Err(DeviceError::CommandFailed(
            "screenshot file is missing or empty after adb pull".to_string(),
        ));
    }

    debug!("Screenshot file size: {} bytes", file_size);

    let bytes = tokio::fs::read(&temp_path).await?;
    let img = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;

    debug!("Screenshot dimensions: {}x{}", img.width(), img.height());

    // Cleanup is automatic when temp_dir goes out of scope
    Ok(Screenshot::new(img))
}
