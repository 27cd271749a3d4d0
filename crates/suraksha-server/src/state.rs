//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use suraksha_core::{Config, MonitorHandle};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<StateInner>,
}

struct StateInner {
    config: Config,
    monitor: MonitorHandle,
    started_at: DateTime<Utc>,
}

impl SharedState {
    /// Create new application state around a running monitor.
    #[must_use]
    pub fn new(config: Config, monitor: MonitorHandle) -> Self {
        Self {
            inner: Arc::new(StateInner {
                config,
                monitor,
                started_at: Utc::now(),
            }),
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Handle to the BLE monitor.
    #[must_use]
    pub fn monitor(&self) -> &MonitorHandle {
        &self.inner.monitor
    }

    /// When the server started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Initialize the monitor on its own task and log the outcome.
    ///
    /// Initialization waits for the radio to power on, which may never
    /// happen; the API keeps serving regardless.
    pub fn spawn_monitor_init(&self) -> JoinHandle<()> {
        let monitor = self.inner.monitor.clone();
        tokio::spawn(async move {
            match monitor.initialize().await {
                Ok(true) => info!("Monitor initialized"),
                Ok(false) => warn!("Location permission denied; the monitor is idle"),
                Err(e) => error!(error = %e, "Monitor failed to initialize"),
            }
        })
    }
}
