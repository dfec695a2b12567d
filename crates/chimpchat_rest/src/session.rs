//! The currently bound device

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::capability::DeviceControl;

/// Holds at most one connected device.
///
/// Binding replaces the previous handle without tearing it down. Readers get
/// a shared clone of the handle, so the lock is never held while a device
/// call is running.
#[derive(Debug)]
pub struct Session<D> {
    device: RwLock<Option<Arc<D>>>,
}

impl<D: DeviceControl> Session<D> {
    /// Create a session with no device bound
    pub fn new() -> Self {
        Self {
            device: RwLock::new(None),
        }
    }

    /// Bind `device`, replacing whatever was bound before
    pub async fn bind(&self, device: D) {
        let serial = device.serial().to_string();
        let previous = self.device.write().await.replace(Arc::new(device));
        match previous {
            Some(previous) => info!("Session rebound from {} to {}", previous.serial(), serial),
            None => info!("Session bound to {}", serial),
        }
    }

    /// The bound device, if any
    pub async fn current(&self) -> Option<Arc<D>> {
        self.device.read().await.clone()
    }
}

impl<D: DeviceControl> Default for Session<D> {
    fn default() -> Self {
        Self::new()
    }
}
