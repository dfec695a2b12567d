//! Axum router assembly and action handlers.

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::capability::{DeviceConnector, DeviceControl};

use super::action::{parse_path, Action, DeviceAction, Route};
use super::error::ApiError;
use super::params::{
    FromQuery, GetPropParams, GetVarParams, InitParams, InstallParams, QueryParams, RebootParams,
    RemoveParams, SnapshotParams, TypeParams,
};
use super::state::AppState;

/// Body served at `/`.
pub const ABOUT: &str = "chimpchat-rest: control an Android device via REST APIs";

/// Build the top-level axum [`Router`].
///
/// Every request, whatever its method, goes through one dispatcher that
/// splits the path itself, so routing follows the action table rather than
/// axum path patterns. A [`TraceLayer`] logs each request/response.
pub fn build<C>(state: AppState<C>) -> Router
where
    C: DeviceConnector + Send + Sync + 'static,
    C::Device: Send + Sync + 'static,
{
    Router::new()
        .fallback(dispatch::<C>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch<C>(State(state): State<AppState<C>>, uri: Uri) -> Response
where
    C: DeviceConnector + Send + Sync + 'static,
    C::Device: Send + Sync + 'static,
{
    let token = match parse_path(uri.path()) {
        Route::About => return (StatusCode::OK, ABOUT).into_response(),
        Route::Token(token) => token,
    };

    let Some(action) = Action::from_token(&token) else {
        debug!(token = %token, "unknown action");
        return ApiError::NotSupported.into_response();
    };

    let params = QueryParams::parse(uri.query());
    match handle(&state, action, &params).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle<C>(
    state: &AppState<C>,
    action: Action,
    params: &QueryParams,
) -> Result<String, ApiError>
where
    C: DeviceConnector + Send + Sync + 'static,
    C::Device: Send + Sync + 'static,
{
    match action {
        Action::Favicon => Ok(String::new()),
        Action::Init => init(state, InitParams::from_query(params)?).await,
        Action::Device(action) => {
            // Clone the handle out so the session lock is released before the call
            let device = state
                .session
                .current()
                .await
                .ok_or(ApiError::DeviceNotConnected)?;
            run_device_action(device.as_ref(), action, params).await
        }
    }
}

async fn init<C>(state: &AppState<C>, params: InitParams) -> Result<String, ApiError>
where
    C: DeviceConnector + Send + Sync + 'static,
    C::Device: Send + Sync + 'static,
{
    info!(
        timeout_ms = params.timeout.as_millis() as u64,
        serialno = params.serialno.as_deref().unwrap_or("any"),
        "waiting for device"
    );
    let device = state
        .connector
        .connect(params.timeout, params.serialno.as_deref())
        .await?;
    state.session.bind(device).await;
    Ok("connected".to_string())
}

/// Validate parameters, then make exactly one call on the device
async fn run_device_action<D: DeviceControl>(
    device: &D,
    action: DeviceAction,
    params: &QueryParams,
) -> Result<String, ApiError> {
    debug!(serial = device.serial(), ?action, "dispatching");

    match action {
        DeviceAction::Reboot => {
            let p = RebootParams::from_query(params)?;
            device.reboot(p.into.as_deref()).await?;
            Ok("rebooted".to_string())
        }
        DeviceAction::Wake => {
            device.wake().await?;
            Ok("morning".to_string())
        }
        DeviceAction::Install => {
            let p = InstallParams::from_query(params)?;
            device.install_package(&p.apk).await?;
            Ok("installed".to_string())
        }
        DeviceAction::Remove => {
            let p = RemoveParams::from_query(params)?;
            Ok(device.remove_package(&p.pkg).await?.to_string())
        }
        DeviceAction::GetVar => {
            let p = GetVarParams::from_query(params)?;
            Ok(device.get_bootloader_var(&p.var).await?)
        }
        DeviceAction::GetProp => {
            let p = GetPropParams::from_query(params)?;
            Ok(device.get_system_property(&p.prop).await?)
        }
        DeviceAction::Type => {
            let p = TypeParams::from_query(params)?;
            device.type_text(&p.text).await?;
            Ok("typed".to_string())
        }
        DeviceAction::TakeSnapshot => {
            let p = SnapshotParams::from_query(params)?;
            let shot = device.capture_screenshot().await?;
            shot.write(p.path.clone(), p.format).await?;
            info!(path = %p.path.display(), "snapshot written");
            Ok("taken".to_string())
        }
    }
}
