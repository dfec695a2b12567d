//! HTTP surface: path routing, query decoding and the axum router

pub mod action;
pub mod error;
pub mod params;
pub mod router;
pub mod state;

pub use action::{parse_path, Action, DeviceAction, Route};
pub use error::{ApiError, DEVICE_NOT_CONNECTED, NOT_SUPPORTED};
pub use params::{ParamError, QueryParams};
pub use router::{build, ABOUT};
pub use state::AppState;
