//! chimpchat-rest - HTTP server for controlling an Android device
//!
//! Usage:
//!     chimpchat-rest [OPTIONS] [HOSTNAME] [PORT]
//!
//! Environment Variables:
//!     CHIMPCHAT_REST_ADB_PATH: adb executable (default: adb)
//!     CHIMPCHAT_REST_CONNECT_POLL_INTERVAL: seconds between device polls during /init
//!     CHIMPCHAT_REST_COMMAND_TIMEOUT: seconds allowed for short adb commands
//!     CHIMPCHAT_REST_INSTALL_TIMEOUT: seconds allowed for adb install/uninstall
//!     CHIMPCHAT_REST_SCREENSHOT_TIMEOUT: seconds allowed for screencap and pull
//!     RUST_LOG: log filter (default: info)

use anyhow::{Context, Result};
use chimpchat_rest::config::{DEFAULT_HOSTNAME, DEFAULT_PORT};
use chimpchat_rest::{http, AdbConnection, AppState, ServerConfig};
use clap::Parser;
use tracing::{error, info, warn};

/// Control an Android device via REST APIs
#[derive(Parser, Debug)]
#[command(name = "chimpchat-rest")]
#[command(about = "Control an Android device via REST APIs")]
#[command(after_help = r#"Endpoints:
    /init?timeout=<ms>&serialno=<serial>   connect and bind a device
    /reboot?into=<mode>                    reboot, optionally into bootloader/recovery
    /wake                                  wake the screen
    /install?apk=<path>                    install an APK from the host
    /remove?pkg=<package>                  uninstall a package
    /getVar?var=<name>                     read a device variable
    /getProp?prop=<name>                   read a system property
    /type?s=<text>                         type text into the focused field
    /takeSnapshot?path=<file>&format=<fmt> save a screenshot on the host

Examples:
    # Listen on 0.0.0.0:8080
    chimpchat-rest

    # Listen on localhost only
    chimpchat-rest 127.0.0.1 9000

    # Use a specific adb build
    chimpchat-rest --adb-path /opt/platform-tools/adb
"#)]
struct Cli {
    /// Address to listen on
    #[arg(default_value = DEFAULT_HOSTNAME)]
    hostname: String,

    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Path to the adb executable
    #[arg(long, env = "CHIMPCHAT_REST_ADB_PATH", default_value = "adb")]
    adb_path: String,
}

/// Warn early when adb cannot be found; requests would fail with 500 anyway
fn check_adb(adb_path: &str) {
    if which::which(adb_path).is_err() {
        warn!(
            "{} is not installed or not in PATH; device requests will fail",
            adb_path
        );
        warn!("  - macOS: brew install android-platform-tools");
        warn!("  - Linux: sudo apt install android-tools-adb");
        warn!("  - Windows: https://developer.android.com/studio/releases/platform-tools");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = ServerConfig::new(args.hostname, args.port);

    check_adb(&args.adb_path);

    let app = http::build(AppState::new(AdbConnection::with_path(args.adb_path)));

    let listener = match tokio::net::TcpListener::bind(config.bind_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config, e);
            return Err(e).with_context(|| format!("binding {}", config));
        }
    };

    println!("server starts at {}", config);
    info!(
        "chimpchat-rest v{} listening on http://{}",
        env!("CARGO_PKG_VERSION"),
        config
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    Ok(())
}
