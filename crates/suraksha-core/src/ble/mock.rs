//! In-memory BLE transport for tests and hardware-less development.
//!
//! [`MockTransport`] plays the radio, [`MockPeripheral`] plays a panic button.
//! Both are cheap handles over shared state, so a test keeps a clone to drive
//! the scenario (advertise, press, drop the link) and to inspect what the
//! monitor did (scans started, connect attempts).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use uuid::Uuid;

use super::{
    BleError, BlePeripheral, BleResult, BleTransport, NotificationStream, PowerState,
    PowerStream, ScanFilter, ScanStream,
};

/// Payload the panic button firmware sends on every press.
pub const PRESS_PAYLOAD: &[u8] = b"Button Pressed!";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct RadioState {
    power: PowerState,
    power_subscribers: Vec<UnboundedSender<PowerState>>,
    scan_tx: Option<UnboundedSender<MockPeripheral>>,
    scans_started: usize,
    scans_stopped: usize,
    active_scans: usize,
    max_concurrent_scans: usize,
    last_filter: Option<ScanFilter>,
    fail_scans: bool,
}

/// Scriptable radio.
#[derive(Debug, Clone)]
pub struct MockTransport {
    radio: Arc<Mutex<RadioState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A radio that is already powered on.
    #[must_use]
    pub fn new() -> Self {
        Self::with_power(PowerState::PoweredOn)
    }

    /// A radio reporting `power` until [`Self::set_power`] is called.
    #[must_use]
    pub fn with_power(power: PowerState) -> Self {
        Self {
            radio: Arc::new(Mutex::new(RadioState {
                power,
                power_subscribers: Vec::new(),
                scan_tx: None,
                scans_started: 0,
                scans_stopped: 0,
                active_scans: 0,
                max_concurrent_scans: 0,
                last_filter: None,
                fail_scans: false,
            })),
        }
    }

    /// Change the power state and notify subscribers.
    pub fn set_power(&self, power: PowerState) {
        let mut radio = lock(&self.radio);
        radio.power = power;
        radio
            .power_subscribers
            .retain(|tx| tx.unbounded_send(power).is_ok());
    }

    /// Make subsequent scan starts fail.
    pub fn set_fail_scans(&self, fail: bool) {
        lock(&self.radio).fail_scans = fail;
    }

    /// Report `peripheral` to the active scan. Returns `false` when no scan is
    /// running.
    pub fn advertise(&self, peripheral: &MockPeripheral) -> bool {
        lock(&self.radio)
            .scan_tx
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(peripheral.clone()).is_ok())
    }

    /// Whether a scan session is currently running.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        lock(&self.radio).active_scans > 0
    }

    /// Number of scan sessions started so far.
    #[must_use]
    pub fn scans_started(&self) -> usize {
        lock(&self.radio).scans_started
    }

    /// Number of stop requests that ended a running scan.
    #[must_use]
    pub fn scans_stopped(&self) -> usize {
        lock(&self.radio).scans_stopped
    }

    /// Highest number of simultaneously running scan sessions observed.
    #[must_use]
    pub fn max_concurrent_scans(&self) -> usize {
        lock(&self.radio).max_concurrent_scans
    }

    /// Filter passed to the most recent scan.
    #[must_use]
    pub fn last_filter(&self) -> Option<ScanFilter> {
        lock(&self.radio).last_filter.clone()
    }
}

impl BleTransport for MockTransport {
    type Peripheral = MockPeripheral;

    fn power_states(&self) -> BoxFuture<'_, BleResult<PowerStream>> {
        async move {
            let (tx, rx) = unbounded();
            let mut radio = lock(&self.radio);
            let _ = tx.unbounded_send(radio.power);
            radio.power_subscribers.push(tx);
            Ok(rx.boxed())
        }
        .boxed()
    }

    fn start_scan(
        &self,
        filter: ScanFilter,
    ) -> BoxFuture<'_, BleResult<ScanStream<Self::Peripheral>>> {
        async move {
            let mut radio = lock(&self.radio);
            if radio.fail_scans {
                return Err(BleError::ScanFailed {
                    message: "mock radio refused to scan".to_string(),
                });
            }
            if radio.power != PowerState::PoweredOn {
                return Err(BleError::AdapterPoweredOff);
            }

            let (tx, rx) = unbounded();
            radio.scan_tx = Some(tx);
            radio.scans_started += 1;
            radio.active_scans += 1;
            radio.max_concurrent_scans = radio.max_concurrent_scans.max(radio.active_scans);
            radio.last_filter = Some(filter);
            Ok(rx.boxed())
        }
        .boxed()
    }

    fn stop_scan(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            let mut radio = lock(&self.radio);
            if radio.active_scans > 0 {
                radio.active_scans -= 1;
                radio.scans_stopped += 1;
            }
            radio.scan_tx = None;
            Ok(())
        }
        .boxed()
    }
}

#[derive(Debug, Default)]
struct LinkState {
    fail_connect: bool,
    hang_connect: bool,
    fail_discovery: bool,
    connect_attempts: usize,
    disconnects: usize,
    subscribed: Option<(Uuid, Uuid)>,
    notify_tx: Option<UnboundedSender<BleResult<Vec<u8>>>>,
}

/// Scriptable panic button.
#[derive(Debug, Clone)]
pub struct MockPeripheral {
    id: String,
    name: Option<String>,
    link: Arc<Mutex<LinkState>>,
}

impl MockPeripheral {
    /// A peripheral advertising `name`.
    #[must_use]
    pub fn new(id: &str, name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            link: Arc::new(Mutex::new(LinkState::default())),
        }
    }

    /// Make connection attempts fail until changed.
    pub fn set_fail_connect(&self, fail: bool) {
        lock(&self.link).fail_connect = fail;
    }

    /// Make connection attempts never complete until changed.
    pub fn set_hang_connect(&self, hang: bool) {
        lock(&self.link).hang_connect = hang;
    }

    /// Make service discovery fail until changed.
    pub fn set_fail_discovery(&self, fail: bool) {
        lock(&self.link).fail_discovery = fail;
    }

    /// Deliver a raw notification. Returns `false` if nobody is subscribed.
    pub fn notify(&self, payload: &[u8]) -> bool {
        lock(&self.link)
            .notify_tx
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(Ok(payload.to_vec())).is_ok())
    }

    /// Deliver one button press.
    pub fn press(&self) -> bool {
        self.notify(PRESS_PAYLOAD)
    }

    /// Fail the notification stream as a radio fault would.
    pub fn drop_link(&self) -> bool {
        lock(&self.link)
            .notify_tx
            .take()
            .is_some_and(|tx| tx.unbounded_send(Err(BleError::Disconnected)).is_ok())
    }

    /// Number of connection attempts made against this peripheral.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        lock(&self.link).connect_attempts
    }

    /// Number of explicit disconnects requested by the central.
    #[must_use]
    pub fn disconnects(&self) -> usize {
        lock(&self.link).disconnects
    }

    /// Service and characteristic the central subscribed to, if any.
    #[must_use]
    pub fn subscription(&self) -> Option<(Uuid, Uuid)> {
        lock(&self.link).subscribed
    }
}

impl BlePeripheral for MockPeripheral {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn advertised_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn connect(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            let hang = {
                let mut link = lock(&self.link);
                link.connect_attempts += 1;
                if link.fail_connect {
                    return Err(BleError::ConnectFailed {
                        peripheral: self.id.clone(),
                        message: "mock connection refused".to_string(),
                    });
                }
                link.hang_connect
            };
            if hang {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
        .boxed()
    }

    fn discover_services(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            if lock(&self.link).fail_discovery {
                return Err(BleError::ConnectFailed {
                    peripheral: self.id.clone(),
                    message: "mock service discovery failed".to_string(),
                });
            }
            Ok(())
        }
        .boxed()
    }

    fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> BoxFuture<'_, BleResult<NotificationStream>> {
        async move {
            let (tx, rx) = unbounded();
            let mut link = lock(&self.link);
            link.notify_tx = Some(tx);
            link.subscribed = Some((service, characteristic));
            Ok(rx.boxed())
        }
        .boxed()
    }

    fn disconnect(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            let mut link = lock(&self.link);
            link.disconnects += 1;
            link.notify_tx = None;
            Ok(())
        }
        .boxed()
    }
}
