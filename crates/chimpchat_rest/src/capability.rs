//! Device capability traits consumed by the HTTP layer
//!
//! The router only talks to these traits. [`crate::adb`] provides the
//! implementation backed by the `adb` tool; tests plug in in-memory stubs.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, ImageFormat};

use crate::error::Result;

/// Whether `name` is safe to hand to the device as a property or variable
/// name. Anything with shell metacharacters or whitespace is rejected.
pub fn is_property_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '@' | '-'))
}

/// Finds and connects to a device.
pub trait DeviceConnector {
    /// Handle to a connected device.
    type Device: DeviceControl;

    /// Wait up to `timeout` for a ready device, restricted to `serial` when given.
    fn connect(
        &self,
        timeout: Duration,
        serial: Option<&str>,
    ) -> impl Future<Output = Result<Self::Device>> + Send;
}

/// Operations on a connected device.
pub trait DeviceControl {
    /// Serial number the handle is bound to.
    fn serial(&self) -> &str;

    /// Reboot, optionally into a named mode such as `bootloader` or `recovery`.
    fn reboot(&self, mode: Option<&str>) -> impl Future<Output = Result<()>> + Send;

    /// Wake the screen.
    fn wake(&self) -> impl Future<Output = Result<()>> + Send;

    /// Install (or reinstall) the package at a host-side path.
    fn install_package(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Uninstall a package, returning whether the device reported success.
    fn remove_package(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Read a device variable.
    fn get_bootloader_var(&self, name: &str) -> impl Future<Output = Result<String>> + Send;

    /// Read a system property.
    fn get_system_property(&self, name: &str) -> impl Future<Output = Result<String>> + Send;

    /// Type text into the focused input field.
    fn type_text(&self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Capture the current screen.
    fn capture_screenshot(&self) -> impl Future<Output = Result<Screenshot>> + Send;
}

/// A captured screen image held in memory
#[derive(Debug, Clone)]
pub struct Screenshot {
    image: DynamicImage,
}

impl Screenshot {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Write the image to `path`.
    ///
    /// Without an explicit `format` the encoder is picked from the path
    /// extension, falling back to PNG when the extension is missing or unknown.
    /// Encoding is CPU-bound; async callers should use [`Screenshot::write`].
    pub fn save(&self, path: &Path, format: Option<ImageFormat>) -> Result<()> {
        let format = format
            .or_else(|| ImageFormat::from_path(path).ok())
            .unwrap_or(ImageFormat::Png);

        // JPEG has no alpha channel
        if format == ImageFormat::Jpeg {
            self.image.to_rgb8().save_with_format(path, format)?;
        } else {
            self.image.save_with_format(path, format)?;
        }
        Ok(())
    }

    /// [`Screenshot::save`] on the blocking pool
    pub async fn write(self, path: PathBuf, format: Option<ImageFormat>) -> Result<()> {
        tokio::task::spawn_blocking(move || self.save(&path, format)).await?
    }
}
