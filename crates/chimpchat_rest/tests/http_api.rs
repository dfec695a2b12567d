//! End-to-end tests for the HTTP surface.
//!
//! Each test builds the real axum router over an in-memory device stub and
//! drives it with `tower::ServiceExt::oneshot`; no port is bound and no
//! device or adb binary is needed.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chimpchat_rest::http::{self, ABOUT};
use chimpchat_rest::{AppState, DeviceConnector, DeviceControl, DeviceError, Result, Screenshot};
use http_body_util::BodyExt;
use tower::ServiceExt;

type CallLog = Arc<Mutex<Vec<String>>>;

/// Serial for which the stub connector reports no device
const MISSING_SERIAL: &str = "missing";

#[derive(Clone, Default)]
struct StubConnector {
    log: CallLog,
    remove_result: bool,
    fail_install: bool,
}

struct StubDevice {
    serial: String,
    log: CallLog,
    remove_result: bool,
    fail_install: bool,
}

impl StubDevice {
    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

impl DeviceConnector for StubConnector {
    type Device = StubDevice;

    async fn connect(&self, timeout: Duration, serial: Option<&str>) -> Result<StubDevice> {
        self.log.lock().unwrap().push(format!(
            "connect:{}:{}",
            timeout.as_millis(),
            serial.unwrap_or("-")
        ));
        if serial == Some(MISSING_SERIAL) {
            return Err(DeviceError::DeviceNotFound(MISSING_SERIAL.to_string()));
        }
        Ok(StubDevice {
            serial: serial.unwrap_or("emulator-5554").to_string(),
            log: Arc::clone(&self.log),
            remove_result: self.remove_result,
            fail_install: self.fail_install,
        })
    }
}

impl DeviceControl for StubDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    async fn reboot(&self, mode: Option<&str>) -> Result<()> {
        self.record(format!("reboot:{}", mode.unwrap_or("-")));
        Ok(())
    }

    async fn wake(&self) -> Result<()> {
        self.record(format!("wake:{}", self.serial));
        Ok(())
    }

    async fn install_package(&self, path: &Path) -> Result<()> {
        self.record(format!("install:{}", path.display()));
        if self.fail_install {
            return Err(DeviceError::CommandFailed(
                "Failure [INSTALL_FAILED_INVALID_APK]".to_string(),
            ));
        }
        Ok(())
    }

    async fn remove_package(&self, name: &str) -> Result<bool> {
        self.record(format!("remove:{}", name));
        Ok(self.remove_result)
    }

    async fn get_bootloader_var(&self, name: &str) -> Result<String> {
        self.record(format!("getVar:{}", name));
        Ok(format!("var-{}", name))
    }

    async fn get_system_property(&self, name: &str) -> Result<String> {
        self.record(format!("getProp:{}", name));
        Ok(format!("{}:{}", self.serial, name))
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.record(format!("type:{}", text));
        Ok(())
    }

    async fn capture_screenshot(&self) -> Result<Screenshot> {
        self.record("snapshot".to_string());
        Ok(Screenshot::new(image::DynamicImage::new_rgb8(2, 2)))
    }
}

fn app_with(connector: StubConnector) -> (Router, CallLog) {
    let log = Arc::clone(&connector.log);
    (http::build(AppState::new(connector)), log)
}

fn app() -> (Router, CallLog) {
    app_with(StubConnector::default())
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Method::GET, uri).await
}

fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_identify_at_root_whatever_the_query() {
    let (app, log) = app();

    for uri in ["/", "/?timeout=abc", "/?init"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, ABOUT);
    }
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn should_answer_plain_text() {
    let (app, _) = app();
    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn should_return_404_for_unknown_actions() {
    let (app, log) = app();

    for uri in ["/nope", "/Init", "/getvar?var=x", "//wake", "/shell?cmd=ls"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, "not supported.");
    }
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn should_return_empty_favicon() {
    let (app, _) = app();
    let (status, body) = get(&app, "/favicon.ico").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[tokio::test]
async fn should_ignore_extra_path_segments() {
    let (app, _) = app();
    get(&app, "/init").await;

    let (status, body) = get(&app, "/wake/now/please").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "morning");
}

#[tokio::test]
async fn should_accept_any_method() {
    let (app, _) = app();
    send(&app, Method::POST, "/init").await;

    let (status, body) = send(&app, Method::POST, "/wake").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "morning");
}

// ---------------------------------------------------------------------------
// Session binding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_refuse_device_actions_before_init() {
    let (app, log) = app();

    for uri in [
        "/reboot",
        "/wake",
        "/install?apk=/tmp/app.apk",
        "/remove?pkg=com.example.app",
        "/getVar?var=build.model",
        "/getProp?prop=ro.build.id",
        "/type?s=hello",
        "/takeSnapshot?path=/tmp/never.png",
        // Missing parameters do not bypass the device check
        "/install",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body, "device not connected.");
    }
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn should_wake_after_init() {
    let (app, log) = app();

    let (status, body) = get(&app, "/init?timeout=5000&serialno=ABC123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "connected");

    let (status, body) = get(&app, "/wake").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "morning");

    assert_eq!(calls(&log), ["connect:5000:ABC123", "wake:ABC123"]);
}

#[tokio::test]
async fn should_use_default_init_timeout() {
    let (app, log) = app();
    get(&app, "/init").await;
    assert_eq!(calls(&log), ["connect:10:-"]);
}

#[tokio::test]
async fn should_replace_device_on_second_init() {
    let (app, log) = app();

    get(&app, "/init?serialno=FIRST").await;
    get(&app, "/init?serialno=SECOND").await;

    let (status, body) = get(&app, "/getProp?prop=ro.serialno").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "SECOND:ro.serialno");

    get(&app, "/wake").await;
    assert_eq!(calls(&log).last().unwrap(), "wake:SECOND");
}

#[tokio::test]
async fn should_keep_binding_when_init_fails() {
    let (app, _) = app();

    get(&app, "/init?serialno=FIRST").await;
    let (status, body) = get(&app, "/init?serialno=missing").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("missing"));

    let (_, body) = get(&app, "/getProp?prop=ro.x").await;
    assert_eq!(body, "FIRST:ro.x");
}

#[tokio::test]
async fn should_stay_unbound_when_first_init_fails() {
    let (app, _) = app();

    get(&app, "/init?serialno=missing").await;
    let (status, _) = get(&app, "/wake").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_remove_result_as_text() {
    let (app, log) = app_with(StubConnector {
        remove_result: false,
        ..Default::default()
    });
    get(&app, "/init").await;

    let (status, body) = get(&app, "/remove?pkg=com.example.app").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "false");
    assert_eq!(calls(&log).last().unwrap(), "remove:com.example.app");

    let (app, _) = app_with(StubConnector {
        remove_result: true,
        ..Default::default()
    });
    get(&app, "/init").await;
    let (_, body) = get(&app, "/remove?pkg=com.example.app").await;
    assert_eq!(body, "true");
}

#[tokio::test]
async fn should_use_first_value_of_repeated_parameter() {
    let (app, log) = app();
    get(&app, "/init").await;

    let (status, body) = get(&app, "/getVar?var=ro.product&var=ignored").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "var-ro.product");
    assert_eq!(calls(&log).last().unwrap(), "getVar:ro.product");
}

#[tokio::test]
async fn should_reboot_into_mode() {
    let (app, log) = app();
    get(&app, "/init").await;

    let (_, body) = get(&app, "/reboot?into=bootloader").await;
    assert_eq!(body, "rebooted");
    let (_, body) = get(&app, "/reboot").await;
    assert_eq!(body, "rebooted");

    let log = calls(&log);
    assert_eq!(&log[log.len() - 2..], ["reboot:bootloader", "reboot:-"]);
}

#[tokio::test]
async fn should_type_decoded_text() {
    let (app, log) = app();
    get(&app, "/init").await;

    let (status, body) = get(&app, "/type?s=hello+world%21").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "typed");
    assert_eq!(calls(&log).last().unwrap(), "type:hello world!");
}

#[tokio::test]
async fn should_install_apk() {
    let (app, log) = app();
    get(&app, "/init").await;

    let (status, body) = get(&app, "/install?apk=%2Ftmp%2Fapp.apk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "installed");
    assert_eq!(calls(&log).last().unwrap(), "install:/tmp/app.apk");
}

#[tokio::test]
async fn should_write_snapshot_file() {
    let (app, _) = app();
    get(&app, "/init").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screen.png");
    let uri = format!(
        "/takeSnapshot?path={}&format=png",
        urlencoding::encode(&path.to_string_lossy())
    );

    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "taken");

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Png
    );
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_keep_serving_after_failed_install() {
    let (app, _) = app_with(StubConnector {
        fail_install: true,
        ..Default::default()
    });
    get(&app, "/init").await;

    let (status, body) = get(&app, "/install?apk=/tmp/broken.apk").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("INSTALL_FAILED_INVALID_APK"));

    let (status, body) = get(&app, "/wake").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "morning");
}

#[tokio::test]
async fn should_reject_malformed_timeout() {
    let (app, log) = app();

    let (status, body) = get(&app, "/init?timeout=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("timeout"));
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn should_reject_missing_required_parameters_after_init() {
    let (app, log) = app();
    get(&app, "/init").await;

    for (uri, name) in [
        ("/install", "apk"),
        ("/remove", "pkg"),
        ("/getVar", "var"),
        ("/getProp?prop=", "prop"),
        ("/type", "s"),
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body.contains(name), "{}: {}", uri, body);
    }

    // Only the init reached the stub
    assert_eq!(calls(&log).len(), 1);
}

#[tokio::test]
async fn should_reject_shell_syntax_in_property_names() {
    let (app, log) = app();
    get(&app, "/init").await;

    for uri in [
        "/getProp?prop=ro.x;reboot",
        "/getProp?prop=a%3Bb",
        "/getVar?var=nope%24%28echo+x%29",
        "/getVar?var=a+b",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body.contains("invalid value"), "{}: {}", uri, body);
    }

    assert_eq!(calls(&log).len(), 1);
}

#[tokio::test]
async fn should_reject_unknown_snapshot_format() {
    let (app, log) = app();
    get(&app, "/init").await;

    let (status, body) = get(&app, "/takeSnapshot?path=/tmp/x&format=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("format"));
    assert!(!calls(&log).contains(&"snapshot".to_string()));
}
