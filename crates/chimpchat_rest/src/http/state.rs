//! Shared application state for axum handlers.

use std::sync::Arc;

use crate::capability::DeviceConnector;
use crate::session::Session;

/// State shared across requests: the connector used by `init` and the
/// session it binds.
///
/// Generic over the connector to avoid dynamic dispatch. `Clone` is
/// implemented manually so the connector itself need not be `Clone`.
pub struct AppState<C: DeviceConnector> {
    pub connector: Arc<C>,
    pub session: Arc<Session<C::Device>>,
}

impl<C: DeviceConnector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            session: Arc::clone(&self.session),
        }
    }
}

impl<C: DeviceConnector> AppState<C> {
    /// State with no device bound yet
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            session: Arc::new(Session::new()),
        }
    }
}
