//! ADB (Android Debug Bridge) backend for the device capability
//!
//! This module provides:
//! - `connection`: running adb, listing devices and waiting for one
//! - `device`: reboot, wake, packages and properties on a connected device
//! - `input`: text input handling
//! - `screenshot`: screenshot capture

mod connection;
mod device;
mod input;
mod screenshot;

pub use connection::{AdbConnection, DeviceInfo};
pub use device::AdbDevice;
