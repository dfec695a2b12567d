//! HTTP error response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::error::DeviceError;

use super::params::ParamError;

/// Body of the 403 returned while no device is bound.
pub const DEVICE_NOT_CONNECTED: &str = "device not connected.";

/// Body of the 404 returned for unknown actions.
pub const NOT_SUPPORTED: &str = "not supported.";

/// Failure of a single request, rendered as a plain-text response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("device not connected.")]
    DeviceNotConnected,

    #[error("not supported.")]
    NotSupported,

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::DeviceNotConnected => StatusCode::FORBIDDEN,
            ApiError::NotSupported => StatusCode::NOT_FOUND,
            ApiError::Param(_) => StatusCode::BAD_REQUEST,
            ApiError::Device(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Device(err) => tracing::error!(error = %err, "device call failed"),
            ApiError::Param(err) => tracing::debug!(error = %err, "rejected parameters"),
            _ => {}
        }

        (status, self.to_string()).into_response()
    }
}
