//! chimpchat_rest: control an Android device through plain HTTP requests
//!
//! This library provides:
//! - A device capability ([`DeviceConnector`], [`DeviceControl`]) the HTTP
//!   layer is written against
//! - An implementation of that capability driving the `adb` tool
//! - A single-device [`Session`] bound by `/init`
//! - The axum router mapping one path segment to one device call, answering
//!   in plain text
//!
//! # Example
//!
//! ```no_run
//! use chimpchat_rest::{http, AdbConnection, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = ServerConfig::default();
//!     let app = http::build(AppState::new(AdbConnection::new()));
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!     axum::serve(listener, app).await
//! }
//! ```

// Core modules
pub mod error;

// Configuration module
pub mod config;

// Device capability and its adb backend
pub mod adb;
pub mod capability;

// Session and HTTP surface
pub mod http;
pub mod session;

// Re-export commonly used types
pub use error::{DeviceError, Result};

pub use config::{ServerConfig, TimingConfig, TIMING_CONFIG};

pub use adb::{AdbConnection, AdbDevice, DeviceInfo};

pub use capability::{DeviceConnector, DeviceControl, Screenshot};

pub use http::{ApiError, AppState};
pub use session::Session;
