//! Bluetooth Low Energy transport abstraction.
//!
//! The monitor only talks to the radio through [`BleTransport`] and
//! [`BlePeripheral`]. Two implementations ship with the crate:
//!
//! - [`bluez`] - BlueZ through `bluer` (feature `bluetooth`, Linux)
//! - [`mock`] - scriptable in-memory radio (feature `mock-bluetooth`, and tests)

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "bluetooth")]
pub mod bluez;
#[cfg(any(test, feature = "mock-bluetooth"))]
pub mod mock;

/// Errors reported by a BLE transport.
#[derive(Debug, Clone, Error)]
pub enum BleError {
    /// No adapter is present.
    #[error("no Bluetooth adapter available")]
    AdapterNotFound,

    /// The adapter is present but powered off.
    #[error("Bluetooth adapter is powered off")]
    AdapterPoweredOff,

    /// Discovery could not be started or stopped.
    #[error("scan failed: {message}")]
    ScanFailed {
        /// Transport-specific detail.
        message: String,
    },

    /// Connecting to or discovering the peripheral failed.
    #[error("connecting to {peripheral} failed: {message}")]
    ConnectFailed {
        /// Peripheral identifier.
        peripheral: String,
        /// Transport-specific detail.
        message: String,
    },

    /// The peripheral does not expose the expected characteristic.
    #[error("characteristic {characteristic} of service {service} not found")]
    CharacteristicNotFound {
        /// GATT service.
        service: Uuid,
        /// GATT characteristic.
        characteristic: Uuid,
    },

    /// The link to the peripheral dropped.
    #[error("peripheral disconnected")]
    Disconnected,

    /// Any other transport failure.
    #[error("Bluetooth error: {message}")]
    Internal {
        /// Transport-specific detail.
        message: String,
    },
}

/// Result alias for transport operations.
pub type BleResult<T> = std::result::Result<T, BleError>;

/// Power state of the local radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// State not reported yet.
    Unknown,
    /// Radio is off.
    PoweredOff,
    /// Radio is on and usable.
    PoweredOn,
}

/// Discovery hints passed to the radio.
///
/// The name is never trusted to the radio: the monitor re-checks it on every
/// discovered peripheral.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Only report peripherals advertising one of these services.
    pub services: Vec<Uuid>,
}

/// Stream of raw characteristic notifications.
///
/// An `Err` item or the end of the stream means the link is gone.
pub type NotificationStream = BoxStream<'static, BleResult<Vec<u8>>>;

/// Stream of peripherals reported by an active scan.
pub type ScanStream<P> = BoxStream<'static, P>;

/// Stream of radio power states, starting with the current one.
pub type PowerStream = BoxStream<'static, PowerState>;

/// The local radio.
pub trait BleTransport: Send + Sync + 'static {
    /// Peripheral handle type produced by scans.
    type Peripheral: BlePeripheral;

    /// Subscribe to power-state changes. The current state is reported first.
    fn power_states(&self) -> BoxFuture<'_, BleResult<PowerStream>>;

    /// Start a discovery session.
    fn start_scan(&self, filter: ScanFilter)
        -> BoxFuture<'_, BleResult<ScanStream<Self::Peripheral>>>;

    /// Stop the active discovery session, if any.
    fn stop_scan(&self) -> BoxFuture<'_, BleResult<()>>;
}

/// A remote peripheral seen during a scan.
pub trait BlePeripheral: Clone + Send + Sync + 'static {
    /// Stable identifier (address on Linux).
    fn id(&self) -> String;

    /// Name from the advertisement, if any.
    fn advertised_name(&self) -> Option<&str>;

    /// Establish the link.
    fn connect(&self) -> BoxFuture<'_, BleResult<()>>;

    /// Resolve services and characteristics.
    fn discover_services(&self) -> BoxFuture<'_, BleResult<()>>;

    /// Enable notifications on a characteristic.
    fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> BoxFuture<'_, BleResult<NotificationStream>>;

    /// Drop the link.
    fn disconnect(&self) -> BoxFuture<'_, BleResult<()>>;
}
