//! BlueZ transport built on `bluer`.
//!
//! Discovery sessions are owned by the returned scan stream; [`BleTransport::stop_scan`]
//! ends the stream, which releases the BlueZ discovery session.
//!
//! A device is reported again whenever one of its properties changes, so a
//! name that only arrives with a later scan response is still seen.

use std::collections::HashSet;
use std::sync::Mutex;

use bluer::{
    Adapter, AdapterEvent, AdapterProperty, Device, DeviceEvent, DeviceProperty,
    DiscoveryFilter, DiscoveryTransport, Session,
};
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    BleError, BlePeripheral, BleResult, BleTransport, NotificationStream, PowerState,
    PowerStream, ScanFilter, ScanStream,
};

fn internal(err: &bluer::Error) -> BleError {
    BleError::Internal {
        message: err.to_string(),
    }
}

/// The default BlueZ adapter.
pub struct BluezTransport {
    // Keeps the D-Bus session alive for the adapter's lifetime.
    _session: Session,
    adapter: Adapter,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl BluezTransport {
    /// Open a BlueZ session and select the default adapter.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::AdapterNotFound`] if bluetoothd is unreachable or no
    /// adapter is present.
    pub async fn new() -> BleResult<Self> {
        let session = Session::new().await.map_err(|e| {
            debug!(error = %e, "BlueZ session unavailable");
            BleError::AdapterNotFound
        })?;
        let adapter = session.default_adapter().await.map_err(|e| {
            debug!(error = %e, "no default BlueZ adapter");
            BleError::AdapterNotFound
        })?;
        info!(adapter = adapter.name(), "Using BLE adapter");

        Ok(Self {
            _session: session,
            adapter,
            stop_tx: Mutex::new(None),
        })
    }

    fn end_current_scan(&self) {
        let sender = self
            .stop_tx
            .lock()
            .map_or(None, |mut slot| slot.take());
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }
}

impl BleTransport for BluezTransport {
    type Peripheral = BluezPeripheral;

    fn power_states(&self) -> BoxFuture<'_, BleResult<PowerStream>> {
        async move {
            let powered = self.adapter.is_powered().await.map_err(|e| internal(&e))?;
            let initial = if powered {
                PowerState::PoweredOn
            } else {
                PowerState::PoweredOff
            };

            let changes = self
                .adapter
                .events()
                .await
                .map_err(|e| internal(&e))?
                .filter_map(|event| async move {
                    match event {
                        AdapterEvent::PropertyChanged(AdapterProperty::Powered(true)) => {
                            Some(PowerState::PoweredOn)
                        }
                        AdapterEvent::PropertyChanged(AdapterProperty::Powered(false)) => {
                            Some(PowerState::PoweredOff)
                        }
                        _ => None,
                    }
                });

            Ok(stream::once(async move { initial }).chain(changes).boxed())
        }
        .boxed()
    }

    fn start_scan(
        &self,
        filter: ScanFilter,
    ) -> BoxFuture<'_, BleResult<ScanStream<Self::Peripheral>>> {
        async move {
            self.end_current_scan();

            let discovery_filter = DiscoveryFilter {
                uuids: filter.services.into_iter().collect::<HashSet<Uuid>>(),
                transport: DiscoveryTransport::Le,
                ..Default::default()
            };
            self.adapter
                .set_discovery_filter(discovery_filter)
                .await
                .map_err(|e| BleError::ScanFailed {
                    message: e.to_string(),
                })?;

            let discovery = self
                .adapter
                .discover_devices_with_changes()
                .await
                .map_err(|e| BleError::ScanFailed {
                    message: e.to_string(),
                })?;

            let (stop_tx, stop_rx) = oneshot::channel();
            if let Ok(mut slot) = self.stop_tx.lock() {
                *slot = Some(stop_tx);
            }

            let adapter = self.adapter.clone();
            let peripherals = discovery
                .take_until(stop_rx)
                .filter_map(move |event| {
                    let adapter = adapter.clone();
                    async move {
                        let AdapterEvent::DeviceAdded(address) = event else {
                            return None;
                        };
                        let device = adapter.device(address).ok()?;
                        let name = device.name().await.ok().flatten();
                        Some(BluezPeripheral { device, name })
                    }
                });

            Ok(peripherals.boxed())
        }
        .boxed()
    }

    fn stop_scan(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            self.end_current_scan();
            Ok(())
        }
        .boxed()
    }
}

/// A BlueZ device seen during discovery.
#[derive(Debug, Clone)]
pub struct BluezPeripheral {
    device: Device,
    name: Option<String>,
}

impl BlePeripheral for BluezPeripheral {
    fn id(&self) -> String {
        self.device.address().to_string()
    }

    fn advertised_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn connect(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            let connected = self.device.is_connected().await.map_err(|e| internal(&e))?;
            if !connected {
                self.device
                    .connect()
                    .await
                    .map_err(|e| BleError::ConnectFailed {
                        peripheral: self.id(),
                        message: e.to_string(),
                    })?;
            }
            Ok(())
        }
        .boxed()
    }

    fn discover_services(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            let services = self
                .device
                .services()
                .await
                .map_err(|e| BleError::ConnectFailed {
                    peripheral: self.id(),
                    message: format!("service discovery failed: {e}"),
                })?;
            debug!(peripheral = %self.id(), services = services.len(), "Services resolved");
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
            for remote_service in self.device.services().await.map_err(|e| internal(&e))? {
                if remote_service.uuid().await.map_err(|e| internal(&e))? != service {
                    continue;
                }
                for remote_char in remote_service
                    .characteristics()
                    .await
                    .map_err(|e| internal(&e))?
                {
                    if remote_char.uuid().await.map_err(|e| internal(&e))? != characteristic {
                        continue;
                    }

                    let notifications = remote_char
                        .notify()
                        .await
                        .map_err(|e| internal(&e))?
                        .map(Ok);

                    // A notify stream can stay silent after the link drops, so
                    // the connection property is watched as well.
                    let disconnects = self
                        .device
                        .events()
                        .await
                        .map_err(|e| internal(&e))?
                        .filter_map(|event| async move {
                            match event {
                                DeviceEvent::PropertyChanged(DeviceProperty::Connected(false)) => {
                                    Some(Err(BleError::Disconnected))
                                }
                                _ => None,
                            }
                        });

                    return Ok(stream::select(notifications, disconnects).boxed());
                }
            }

            Err(BleError::CharacteristicNotFound {
                service,
                characteristic,
            })
        }
        .boxed()
    }

    fn disconnect(&self) -> BoxFuture<'_, BleResult<()>> {
        async move {
            self.device.disconnect().await.map_err(|e| internal(&e))
        }
        .boxed()
    }
}
