//! Panic button monitor.
//!
//! A single task owns the radio, the connection and the press counter. Every
//! input (commands from [`MonitorHandle`], radio power changes, scan results,
//! connection outcomes, notifications and timers) is handled in turn by that
//! task, so no state is ever touched concurrently.
//!
//! ```text
//! Idle --power on--> Scanning --name match--> Connecting --subscribed--> Monitoring
//!                       ^                          |                         |
//!                       +------- backoff ----------+                         |
//!                       +------------------ link lost -----------------------+
//! ```
//!
//! Emergency dispatches run on their own tasks and never block the monitor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ble::{
    BleResult, BlePeripheral, BleTransport, NotificationStream, PowerState, PowerStream,
    ScanFilter, ScanStream,
};
use crate::config::{
    Config, DEFAULT_CHARACTERISTIC_UUID, DEFAULT_DEVICE_NAME, DEFAULT_SERVICE_UUID,
};
use crate::emergency::{EmergencyReceipt, EmergencyService};
use crate::error::{Result, SurakshaError};
use crate::events::{EventBus, EventKind, MonitorEvent, Subscription};
use crate::press::{Classification, Notification, PressDecoder};

#[cfg(test)]
mod tests;

const COMMAND_CAPACITY: usize = 32;

/// Lifecycle of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Not initialized yet, or waiting for the radio to power on.
    Idle,
    /// Looking for the panic button (including waiting to retry a scan).
    Scanning,
    /// Connecting to a discovered panic button.
    Connecting,
    /// Subscribed to press notifications.
    Monitoring,
    /// Torn down; the monitor accepts no further commands.
    Stopped,
}

/// Foreground state of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    /// In the foreground.
    Active,
    /// Transitioning or partially obscured.
    Inactive,
    /// Not visible.
    Background,
}

/// Snapshot of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonitorStatus {
    /// Current lifecycle state.
    pub state: MonitorState,
    /// Connected peripheral, if any.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub device: Option<String>,
    /// Presses counted in the burst that is still open.
    pub press_count: u32,
    /// Whether a rescan is scheduled after a failure.
    pub rescan_pending: bool,
    /// Last reported foreground state.
    pub app_state: AppState,
}

/// What to look for and how long to wait.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Advertised name of the panic button.
    pub device_name: String,
    /// GATT service holding the press characteristic.
    pub service_uuid: Uuid,
    /// Characteristic delivering press notifications.
    pub characteristic_uuid: Uuid,
    /// Restrict scanning to peripherals advertising `service_uuid`.
    pub filter_by_service: bool,
    /// Recognizes press payloads.
    pub decoder: PressDecoder,
    /// Quiet time that closes a press burst.
    pub debounce: Duration,
    /// Periodic scan restart while nothing is found.
    pub scan_safety_net: Duration,
    /// Delay before rescanning after a failure.
    pub connect_backoff: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            service_uuid: DEFAULT_SERVICE_UUID,
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            filter_by_service: false,
            decoder: PressDecoder::default(),
            debounce: Duration::from_millis(500),
            scan_safety_net: Duration::from_secs(60),
            connect_backoff: Duration::from_secs(3),
        }
    }
}

impl MonitorSettings {
    /// Settings from the `[device]` and `[timing]` sections.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the press pattern is not a valid regex.
    pub fn from_config(config: &Config) -> Result<Self> {
        let pattern = config.device.press_regex().map_err(|e| {
            SurakshaError::ConfigValidationError(format!("device.press_pattern: {e}"))
        })?;
        Ok(Self {
            device_name: config.device.name.clone(),
            service_uuid: config.device.service_uuid,
            characteristic_uuid: config.device.characteristic_uuid,
            filter_by_service: config.device.filter_by_service,
            decoder: PressDecoder::new(pattern),
            debounce: config.timing.debounce(),
            scan_safety_net: config.timing.scan_safety_net(),
            connect_backoff: config.timing.connect_backoff(),
        })
    }

    fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            services: if self.filter_by_service {
                vec![self.service_uuid]
            } else {
                Vec::new()
            },
        }
    }
}

enum Command {
    Initialize(oneshot::Sender<Result<bool>>),
    StartScanning(oneshot::Sender<()>),
    AppStateChanged(AppState, oneshot::Sender<()>),
    Status(oneshot::Sender<MonitorStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap, cloneable handle to a running monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    emergency: Arc<EmergencyService>,
}

impl MonitorHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SurakshaError::MonitorStopped)?;
        rx.await.map_err(|_| SurakshaError::MonitorStopped)
    }

    /// Request location access, then start scanning once the radio reports
    /// powered on.
    ///
    /// Resolves `Ok(false)` when location access is denied; the monitor stays
    /// idle and may be initialized again later. Resolves `Ok(true)` once
    /// scanning was requested, immediately if the monitor is already past
    /// [`MonitorState::Idle`].
    ///
    /// # Errors
    ///
    /// Returns an error if the radio cannot be observed or the monitor stops
    /// before the radio powers on.
    pub async fn initialize(&self) -> Result<bool> {
        self.request(Command::Initialize).await?
    }

    /// Start (or restart) scanning. Ignored while a connection is being
    /// established or monitored.
    ///
    /// # Errors
    ///
    /// Returns [`SurakshaError::MonitorStopped`] after shutdown.
    pub async fn start_scanning(&self) -> Result<()> {
        self.request(Command::StartScanning).await
    }

    /// Report a foreground transition of the host application.
    ///
    /// # Errors
    ///
    /// Returns [`SurakshaError::MonitorStopped`] after shutdown.
    pub async fn app_state_changed(&self, state: AppState) -> Result<()> {
        self.request(|tx| Command::AppStateChanged(state, tx)).await
    }

    /// Current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SurakshaError::MonitorStopped`] after shutdown.
    pub async fn status(&self) -> Result<MonitorStatus> {
        self.request(Command::Status).await
    }

    /// Send an emergency alert right away, outside of any press burst.
    ///
    /// # Errors
    ///
    /// See [`EmergencyService::trigger`].
    ///
    /// The attempt runs on its own task: dropping the returned future does not
    /// cancel it, and its outcome is still published on the bus.
    pub async fn trigger_emergency(&self) -> Result<EmergencyReceipt> {
        let emergency = Arc::clone(&self.emergency);
        tokio::spawn(async move { emergency.trigger().await })
            .await
            .map_err(|e| SurakshaError::DispatchFailed(e.to_string()))?
    }

    /// The bus events are published on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.emergency.events()
    }

    /// Subscribe to every event.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.events().subscribe()
    }

    /// Subscribe to the named event kinds only.
    #[must_use]
    pub fn subscribe_to(&self, kinds: impl IntoIterator<Item = EventKind>) -> Subscription {
        self.events().subscribe_to(kinds)
    }

    /// Stop scanning, disconnect and cancel every timer. Emergency
    /// dispatches already under way run to completion.
    ///
    /// Stopping an already stopped monitor is a no-op.
    pub async fn shutdown(&self) {
        let _ = self.request(Command::Shutdown).await;
    }
}

struct Link<P> {
    peripheral: P,
    notifications: NotificationStream,
}

/// The monitor task. Build it with [`Monitor::new`] and start it with
/// [`Monitor::spawn`].
pub struct Monitor<T: BleTransport> {
    transport: T,
    settings: MonitorSettings,
    emergency: Arc<EmergencyService>,
    state: MonitorState,
    app_state: AppState,
    power: Option<PowerStream>,
    pending_init: Vec<oneshot::Sender<Result<bool>>>,
    scan: Option<ScanStream<T::Peripheral>>,
    connecting: Option<BoxFuture<'static, BleResult<Link<T::Peripheral>>>>,
    peripheral: Option<T::Peripheral>,
    notifications: Option<NotificationStream>,
    press_count: u32,
    burst_deadline: Option<Instant>,
    safety_net_deadline: Option<Instant>,
    rescan_deadline: Option<Instant>,
}

impl<T: BleTransport> Monitor<T> {
    /// A monitor driving `transport`; alerts go through `emergency`, events
    /// are published on its bus.
    pub fn new(transport: T, settings: MonitorSettings, emergency: Arc<EmergencyService>) -> Self {
        Self {
            transport,
            settings,
            emergency,
            state: MonitorState::Idle,
            app_state: AppState::Active,
            power: None,
            pending_init: Vec::new(),
            scan: None,
            connecting: None,
            peripheral: None,
            notifications: None,
            press_count: 0,
            burst_deadline: None,
            safety_net_deadline: None,
            rescan_deadline: None,
        }
    }

    /// Start the monitor task. It runs until [`MonitorHandle::shutdown`] or
    /// until every handle is dropped.
    #[must_use]
    pub fn spawn(self) -> MonitorHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = MonitorHandle {
            commands: tx,
            emergency: Arc::clone(&self.emergency),
        };
        tokio::spawn(self.run(rx));
        handle
    }

    fn events(&self) -> &EventBus {
        self.emergency.events()
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("Monitor task started");
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("Every monitor handle dropped");
                        self.teardown().await;
                        break;
                    }
                },
                notification = next_item(&mut self.notifications) => {
                    self.on_notification(notification).await;
                }
                outcome = next_outcome(&mut self.connecting) => {
                    self.connecting = None;
                    self.on_connect_outcome(outcome);
                }
                found = next_item(&mut self.scan) => self.on_discovered(found).await,
                power = next_item(&mut self.power) => self.on_power(power).await,
                () = wait_until(self.burst_deadline) => self.close_burst(),
                () = wait_until(self.rescan_deadline) => {
                    self.rescan_deadline = None;
                    self.start_scanning().await;
                }
                () = wait_until(self.safety_net_deadline) => self.on_safety_net().await,
            }
        }

        // Refuse anything still queued.
        commands.close();
        while let Some(command) = commands.recv().await {
            if let Command::Initialize(reply) = command {
                let _ = reply.send(Err(SurakshaError::MonitorStopped));
            }
        }
        debug!("Monitor task finished");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Initialize(reply) => self.initialize(reply).await,
            Command::StartScanning(ack) => {
                self.start_scanning().await;
                let _ = ack.send(());
            }
            Command::AppStateChanged(state, ack) => {
                self.app_state_changed(state).await;
                let _ = ack.send(());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            // Handled by the run loop.
            Command::Shutdown(ack) => {
                let _ = ack.send(());
            }
        }
    }

    fn status(&self) -> MonitorStatus {
        MonitorStatus {
            state: self.state,
            device: self.peripheral.as_ref().map(BlePeripheral::id),
            press_count: self.press_count,
            rescan_pending: self.rescan_deadline.is_some(),
            app_state: self.app_state,
        }
    }

    async fn initialize(&mut self, reply: oneshot::Sender<Result<bool>>) {
        if self.state != MonitorState::Idle {
            let _ = reply.send(Ok(true));
            return;
        }
        if self.power.is_some() {
            // Already waiting for power on.
            self.pending_init.push(reply);
            return;
        }

        if !self.emergency.request_location_permission().await {
            warn!("Location permission denied; monitor stays idle");
            let _ = reply.send(Ok(false));
            return;
        }

        match self.transport.power_states().await {
            Ok(states) => {
                debug!("Waiting for the radio to power on");
                self.power = Some(states);
                self.pending_init.push(reply);
            }
            Err(e) => {
                warn!(error = %e, "Cannot observe radio power state");
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    async fn on_power(&mut self, power: Option<PowerState>) {
        match power {
            Some(PowerState::PoweredOn) => {
                self.power = None;
                info!("Radio powered on");
                if self.state == MonitorState::Idle {
                    self.start_scanning().await;
                }
                for reply in self.pending_init.drain(..) {
                    let _ = reply.send(Ok(true));
                }
            }
            Some(state) => debug!(?state, "Radio not powered on yet"),
            None => {
                self.power = None;
                warn!("Radio power updates ended before power on");
                for reply in self.pending_init.drain(..) {
                    let _ = reply.send(Err(SurakshaError::BluetoothAdapterPoweredOff));
                }
            }
        }
    }

    /// Stop any scan in progress and start a fresh one. At most one scan
    /// session is ever active.
    async fn start_scanning(&mut self) {
        match self.state {
            MonitorState::Stopped => return,
            MonitorState::Connecting | MonitorState::Monitoring => {
                debug!(state = ?self.state, "Not scanning while a connection is in use");
                return;
            }
            MonitorState::Idle | MonitorState::Scanning => {}
        }

        self.rescan_deadline = None;
        self.scan = None;
        if let Err(e) = self.transport.stop_scan().await {
            debug!(error = %e, "Stopping previous scan failed");
        }

        self.state = MonitorState::Scanning;
        match self.transport.start_scan(self.settings.scan_filter()).await {
            Ok(found) => {
                info!(device = %self.settings.device_name, "Scanning for panic button");
                self.scan = Some(found);
                self.safety_net_deadline = Some(Instant::now() + self.settings.scan_safety_net);
            }
            Err(e) => {
                warn!(error = %e, "Scan could not start; retrying after backoff");
                self.schedule_rescan();
            }
        }
    }

    fn schedule_rescan(&mut self) {
        self.rescan_deadline = Some(Instant::now() + self.settings.connect_backoff);
    }

    async fn on_safety_net(&mut self) {
        self.safety_net_deadline = None;
        match self.state {
            MonitorState::Scanning => {
                info!("Nothing found yet; restarting scan");
                self.start_scanning().await;
            }
            MonitorState::Connecting => {
                warn!("Connection attempt still pending; abandoning it and rescanning");
                self.connecting = None;
                self.state = MonitorState::Scanning;
                self.start_scanning().await;
            }
            _ => trace!(state = ?self.state, "Safety net ignored"),
        }
    }

    async fn on_discovered(&mut self, found: Option<T::Peripheral>) {
        let Some(peripheral) = found else {
            self.scan = None;
            if self.state == MonitorState::Scanning {
                warn!("Scan ended unexpectedly; retrying after backoff");
                self.schedule_rescan();
            }
            return;
        };

        if peripheral.advertised_name() != Some(self.settings.device_name.as_str()) {
            trace!(
                peripheral = %peripheral.id(),
                name = ?peripheral.advertised_name(),
                "Ignoring peripheral"
            );
            return;
        }

        info!(peripheral = %peripheral.id(), "Panic button found; connecting");
        self.scan = None;
        if let Err(e) = self.transport.stop_scan().await {
            debug!(error = %e, "Stopping scan failed");
        }

        self.state = MonitorState::Connecting;
        self.connecting = Some(
            establish(
                peripheral,
                self.settings.service_uuid,
                self.settings.characteristic_uuid,
            )
            .boxed(),
        );
    }

    fn on_connect_outcome(&mut self, outcome: BleResult<Link<T::Peripheral>>) {
        match outcome {
            Ok(link) => {
                let device = link.peripheral.id();
                info!(%device, "Panic button connected; monitoring presses");
                self.peripheral = Some(link.peripheral);
                self.notifications = Some(link.notifications);
                self.state = MonitorState::Monitoring;
                self.safety_net_deadline = None;
                self.rescan_deadline = None;
                self.events().emit(MonitorEvent::DeviceConnected { device });
            }
            Err(e) => {
                warn!(
                    error = %e,
                    backoff = ?self.settings.connect_backoff,
                    "Connection failed; rescanning after backoff"
                );
                self.state = MonitorState::Scanning;
                self.schedule_rescan();
            }
        }
    }

    async fn on_notification(&mut self, notification: Option<BleResult<Vec<u8>>>) {
        match notification {
            Some(Ok(payload)) => match self.settings.decoder.decode(&payload) {
                Notification::Press => {
                    self.press_count = self.press_count.saturating_add(1);
                    self.burst_deadline = Some(Instant::now() + self.settings.debounce);
                    debug!(count = self.press_count, "Press received");
                }
                Notification::Ignored(text) => trace!(%text, "Ignoring notification"),
            },
            Some(Err(e)) => self.on_link_lost(&e.to_string()).await,
            None => self.on_link_lost("notification stream ended").await,
        }
    }

    /// An open burst is left alone; it closes on its own timer.
    async fn on_link_lost(&mut self, reason: &str) {
        warn!(%reason, "Panic button link lost; rescanning");
        self.notifications = None;
        self.peripheral = None;
        self.state = MonitorState::Scanning;
        self.events().emit(MonitorEvent::DeviceDisconnected);
        self.start_scanning().await;
    }

    fn close_burst(&mut self) {
        self.burst_deadline = None;
        let count = std::mem::take(&mut self.press_count);
        let classification = Classification::from_count(count);
        info!(count, ?classification, "Press burst closed");

        self.events().emit(match classification {
            Classification::Double => MonitorEvent::DoublePress,
            Classification::Triple => MonitorEvent::TriplePress,
            Classification::Other(count) => MonitorEvent::PressesDetected { count },
        });

        if classification.triggers_emergency() {
            let emergency = Arc::clone(&self.emergency);
            tokio::spawn(async move {
                // Outcome is logged and published by the service.
                let _ = emergency.trigger().await;
            });
        }
    }

    async fn app_state_changed(&mut self, next: AppState) {
        let previous = std::mem::replace(&mut self.app_state, next);
        debug!(?previous, ?next, "App state changed");

        let foregrounded = next == AppState::Active && previous != AppState::Active;
        if foregrounded && self.state == MonitorState::Scanning {
            info!("App foregrounded; restarting scan");
            self.start_scanning().await;
        }
    }

    async fn teardown(&mut self) {
        if self.state == MonitorState::Stopped {
            return;
        }
        self.burst_deadline = None;
        self.safety_net_deadline = None;
        self.rescan_deadline = None;
        self.press_count = 0;
        self.power = None;
        self.connecting = None;

        self.scan = None;
        if let Err(e) = self.transport.stop_scan().await {
            debug!(error = %e, "Stopping scan failed");
        }

        self.notifications = None;
        if let Some(peripheral) = self.peripheral.take() {
            if let Err(e) = peripheral.disconnect().await {
                debug!(error = %e, "Disconnect failed");
            }
            self.events().emit(MonitorEvent::DeviceDisconnected);
        }

        for reply in self.pending_init.drain(..) {
            let _ = reply.send(Err(SurakshaError::MonitorStopped));
        }
        self.state = MonitorState::Stopped;
        info!("Monitor stopped");
    }
}

/// Connect, discover services and subscribe to the press characteristic.
/// A half-established link is disconnected before the error is returned.
async fn establish<P: BlePeripheral>(
    peripheral: P,
    service: Uuid,
    characteristic: Uuid,
) -> BleResult<Link<P>> {
    peripheral.connect().await?;

    if let Err(e) = peripheral.discover_services().await {
        let _ = peripheral.disconnect().await;
        return Err(e);
    }

    match peripheral.subscribe(service, characteristic).await {
        Ok(notifications) => Ok(Link {
            peripheral,
            notifications,
        }),
        Err(e) => {
            let _ = peripheral.disconnect().await;
            Err(e)
        }
    }
}

async fn next_item<S: Stream + Unpin>(stream: &mut Option<S>) -> Option<S::Item> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn next_outcome<F: Future + Unpin>(future: &mut Option<F>) -> F::Output {
    match future {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
