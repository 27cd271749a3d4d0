//! # suraksha-server
//!
//! Runs the panic button monitor and serves its HTTP API.
//!
//! This binary provides:
//! - The BLE monitor (scan, connect, press bursts, emergency dispatch)
//! - REST API for status, app state and manual alerts
//! - Server-sent events for the companion app
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development, without a radio
//! cargo run --package suraksha-server --no-default-features --features mock-bluetooth
//!
//! # Production
//! SURAKSHA_ENV=production ./suraksha-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

#[cfg(not(any(feature = "bluetooth", feature = "mock-bluetooth")))]
compile_error!("enable the `bluetooth` or `mock-bluetooth` feature");

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use suraksha_core::{
    credentials, BleTransport, Config, EmergencyService, EventBus, FixedPosition, HttpDispatcher,
    Monitor, MonitorSettings,
};
use suraksha_server::api::create_router;
use suraksha_server::logging;
use suraksha_server::state::SharedState;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Environment variable pointing at the configuration file.
const CONFIG_PATH_ENV: &str = "SURAKSHA_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(logging::is_production())?;

    info!("Starting suraksha-server v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("loading configuration")?;

    #[cfg(feature = "bluetooth")]
    let transport = suraksha_core::BluezTransport::new()
        .await
        .context("opening the Bluetooth adapter")?;

    #[cfg(all(feature = "mock-bluetooth", not(feature = "bluetooth")))]
    let transport = {
        tracing::warn!("Built without Bluetooth support; using the in-memory radio");
        suraksha_core::MockTransport::new()
    };

    serve(config, transport).await
}

async fn serve<T: BleTransport>(config: Config, transport: T) -> anyhow::Result<()> {
    let dispatcher =
        HttpDispatcher::from_config(&config.dispatch).context("building the dispatch client")?;
    let emergency = EmergencyService::new(
        Arc::new(FixedPosition::from_config(&config.location)),
        Arc::from(credentials::from_config(&config.credentials)),
        Arc::new(dispatcher),
        EventBus::default(),
    )
    .configured(&config);

    let settings = MonitorSettings::from_config(&config)?;
    let monitor = Monitor::new(transport, settings, Arc::new(emergency)).spawn();

    let addr = config.server.bind_address;
    let state = SharedState::new(config, monitor.clone());
    state.spawn_monitor_init();
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped; shutting down monitor");
    monitor.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
