//! # suraksha-core
//!
//! Core logic for the Suraksha panic button: a BLE button that sends an
//! emergency alert with the user's location when pressed three times.
//!
//! This crate provides:
//! - Discovery of and connection to the panic button over BLE
//! - Press burst detection (double press, triple press, anything else)
//! - Emergency dispatch to the alerting backend, at most once per burst
//! - Typed events for the UI layer
//!
//! ## Architecture
//!
//! - [`monitor`] - The single task owning the radio, connection and press counter
//! - [`ble`] - Transport abstraction with BlueZ and in-memory implementations
//! - [`press`] - Notification decoding and burst classification
//! - [`emergency`] - Credential, location and dispatch, in that order
//! - [`dispatch`] - HTTP client for the alerting backend
//! - [`location`] - Position providers
//! - [`credentials`] - Session token sources
//! - [`events`] - Broadcast bus for [`MonitorEvent`]s
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod ble;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod emergency;
pub mod error;
pub mod events;
pub mod location;
pub mod monitor;
pub mod press;
pub mod types;

// Re-export primary types for convenience
#[cfg(any(test, feature = "mock-bluetooth"))]
pub use ble::mock::{MockPeripheral, MockTransport};
pub use ble::{BleError, BlePeripheral, BleResult, BleTransport, PowerState, ScanFilter};
#[cfg(feature = "bluetooth")]
pub use ble::bluez::{BluezPeripheral, BluezTransport};
pub use config::{
    Config, ConfigError, ConfigResult, CredentialsConfig, DeviceConfig, DispatchConfig,
    LocationConfig, ServerConfig, TimingConfig,
};
pub use credentials::{CredentialStore, FileCredentialStore, StaticCredentials};
pub use dispatch::{DispatchError, EmergencyDispatcher, EmergencyPayload, HttpDispatcher};
pub use emergency::{EmergencyReceipt, EmergencyService};
pub use error::{Error, Result, SurakshaError};
pub use events::{EmergencyErrorKind, EventBus, EventKind, MonitorEvent, Subscription};
pub use location::{Coordinates, FixedPosition, LocationError, PositionProvider};
pub use monitor::{AppState, Monitor, MonitorHandle, MonitorSettings, MonitorState, MonitorStatus};
pub use press::{Classification, Notification, PressDecoder};
pub use types::HealthResponse;
