//! Configuration module
//!
//! - `timing`: timeouts and poll intervals for `adb` commands
//! - `server`: listen address of the HTTP server

mod server;
mod timing;

pub use server::{ServerConfig, DEFAULT_HOSTNAME, DEFAULT_PORT};
pub use timing::{TimingConfig, TIMING_CONFIG};
