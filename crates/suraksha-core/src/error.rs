//! Unified error types for the suraksha core library.
//!
//! This module provides a unified error type [`SurakshaError`] that covers all failure
//! modes across the system. Each module also has its own specific error type
//! (`ConfigError`, `BleError`, `LocationError`, `DispatchError`) for internal use.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **Recoverability**: Transport failures are marked recoverable, dispatch failures
//!   are surfaced to a human
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! # Example
//!
//! ```rust
//! use suraksha_core::error::{Result, SurakshaError};
//!
//! fn require_token(token: Option<String>) -> Result<String> {
//!     token.ok_or(SurakshaError::AuthenticationRequired)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all suraksha operations.
#[derive(Debug, Error)]
pub enum SurakshaError {
    // =========================================================================
    // PERMISSION ERRORS
    // =========================================================================
    /// Radio or location permission was withheld by the platform.
    #[error("Permission denied: {0}. Grant the permission and restart the monitor.")]
    PermissionDenied(String),

    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth adapter exists but is powered off.
    #[error("Bluetooth adapter is powered off. Run 'bluetoothctl power on' to enable.")]
    BluetoothAdapterPoweredOff,

    /// Connecting to the panic button (or discovering its services) failed.
    #[error("Connection to the panic button failed: {0}")]
    ConnectionFailed(String),

    /// Bluetooth device scanning failed.
    #[error("Bluetooth scan failed: {0}")]
    BluetoothScanFailed(String),

    // =========================================================================
    // EMERGENCY DISPATCH ERRORS
    // =========================================================================
    /// No bearer credential is available for the acting user.
    #[error("Authentication required: no credential is stored. Log in before sending alerts.")]
    AuthenticationRequired,

    /// The emergency alert could not be delivered.
    #[error("Emergency dispatch failed: {0}")]
    DispatchFailed(String),

    // =========================================================================
    // MONITOR ERRORS
    // =========================================================================
    /// The monitor task has been torn down and no longer accepts commands.
    #[error("The BLE monitor is not running")]
    MonitorStopped,

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for suraksha operations.
pub type Result<T> = std::result::Result<T, SurakshaError>;

/// Short alias for [`SurakshaError`].
pub type Error = SurakshaError;

impl SurakshaError {
    /// Returns `true` if this error is related to Bluetooth operations.
    #[inline]
    #[must_use]
    pub const fn is_bluetooth_error(&self) -> bool {
        matches!(
            self,
            Self::BluetoothAdapterNotFound
                | Self::BluetoothAdapterPoweredOff
                | Self::ConnectionFailed(_)
                | Self::BluetoothScanFailed(_)
        )
    }

    /// Returns `true` if this error is related to sending an emergency alert.
    #[inline]
    #[must_use]
    pub const fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::AuthenticationRequired | Self::DispatchFailed(_))
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if the monitor recovers from this error on its own
    /// (backoff and rescan).
    ///
    /// Dispatch failures are deliberately not recoverable: the emergency feature
    /// never retries behind the user's back.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::BluetoothScanFailed(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 401 Unauthorized - the user has to log in first
            Self::AuthenticationRequired => 401,

            // 403 Forbidden - the platform refused a permission
            Self::PermissionDenied(_) => 403,

            // 404 Not Found
            Self::ConfigNotFound(_) => 404,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error
            Self::IoError(_) => 500,

            // 502 Bad Gateway - the dispatch endpoint failed us
            Self::DispatchFailed(_) => 502,

            // 503 Service Unavailable - Bluetooth hardware or monitor issues
            Self::BluetoothAdapterNotFound
            | Self::BluetoothAdapterPoweredOff
            | Self::ConnectionFailed(_)
            | Self::BluetoothScanFailed(_)
            | Self::MonitorStopped => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::BluetoothScanFailed(_) => "BLUETOOTH_SCAN_FAILED",
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::DispatchFailed(_) => "DISPATCH_FAILED",
            Self::MonitorStopped => "MONITOR_STOPPED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for SurakshaError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::ble::BleError> for SurakshaError {
    fn from(err: crate::ble::BleError) -> Self {
        use crate::ble::BleError;
        match err {
            BleError::AdapterNotFound => Self::BluetoothAdapterNotFound,
            BleError::AdapterPoweredOff => Self::BluetoothAdapterPoweredOff,
            BleError::ScanFailed { message } => Self::BluetoothScanFailed(message),
            BleError::ConnectFailed { .. }
            | BleError::CharacteristicNotFound { .. }
            | BleError::Disconnected
            | BleError::Internal { .. } => Self::ConnectionFailed(err.to_string()),
        }
    }
}

impl From<crate::location::LocationError> for SurakshaError {
    fn from(err: crate::location::LocationError) -> Self {
        use crate::location::LocationError;
        match err {
            LocationError::PermissionDenied => Self::PermissionDenied("location".to_string()),
            LocationError::Unavailable(_) | LocationError::Timeout { .. } => {
                Self::DispatchFailed(err.to_string())
            }
        }
    }
}

impl From<crate::dispatch::DispatchError> for SurakshaError {
    fn from(err: crate::dispatch::DispatchError) -> Self {
        Self::DispatchFailed(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_bluetooth_error_classification() {
        assert!(SurakshaError::BluetoothAdapterNotFound.is_bluetooth_error());
        assert!(SurakshaError::BluetoothAdapterPoweredOff.is_bluetooth_error());
        assert!(SurakshaError::ConnectionFailed("gatt".into()).is_bluetooth_error());
        assert!(SurakshaError::BluetoothScanFailed("busy".into()).is_bluetooth_error());

        assert!(!SurakshaError::AuthenticationRequired.is_bluetooth_error());
    }

    #[test]
    fn test_dispatch_error_classification() {
        assert!(SurakshaError::AuthenticationRequired.is_dispatch_error());
        assert!(SurakshaError::DispatchFailed("503".into()).is_dispatch_error());
        assert!(!SurakshaError::MonitorStopped.is_dispatch_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(SurakshaError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(SurakshaError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(SurakshaError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!SurakshaError::BluetoothAdapterNotFound.is_config_error());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(SurakshaError::ConnectionFailed("timeout".into()).is_recoverable());
        assert!(SurakshaError::BluetoothScanFailed("busy".into()).is_recoverable());
        assert!(!SurakshaError::DispatchFailed("network".into()).is_recoverable());
        assert!(!SurakshaError::AuthenticationRequired.is_recoverable());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(SurakshaError::AuthenticationRequired.http_status_code(), 401);
        assert_eq!(
            SurakshaError::PermissionDenied("location".into()).http_status_code(),
            403
        );
        assert_eq!(
            SurakshaError::ConfigValidationError("bad".into()).http_status_code(),
            422
        );
        assert_eq!(
            SurakshaError::DispatchFailed("500".into()).http_status_code(),
            502
        );
        assert_eq!(SurakshaError::MonitorStopped.http_status_code(), 503);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SurakshaError::AuthenticationRequired.error_code(),
            "AUTHENTICATION_REQUIRED"
        );
        assert_eq!(
            SurakshaError::DispatchFailed(String::new()).error_code(),
            "DISPATCH_FAILED"
        );
        assert_eq!(
            SurakshaError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let err: SurakshaError = io_err.into();
        assert!(matches!(err, SurakshaError::IoError(_)));
    }

    #[test]
    fn test_from_ble_error() {
        let err: SurakshaError = crate::ble::BleError::Disconnected.into();
        assert!(matches!(err, SurakshaError::ConnectionFailed(_)));
        assert!(err.is_recoverable());

        let err: SurakshaError = crate::ble::BleError::AdapterNotFound.into();
        assert!(matches!(err, SurakshaError::BluetoothAdapterNotFound));
    }

    #[test]
    fn test_from_location_error() {
        let err: SurakshaError = crate::location::LocationError::PermissionDenied.into();
        assert!(matches!(err, SurakshaError::PermissionDenied(_)));

        let err: SurakshaError =
            crate::location::LocationError::Unavailable("no fix".into()).into();
        assert!(matches!(err, SurakshaError::DispatchFailed(_)));
        assert!(err.to_string().contains("no fix"));
    }

    #[test]
    fn test_from_dispatch_error() {
        let err: SurakshaError = crate::dispatch::DispatchError::Rejected {
            status: 500,
            message: "Twilio down".into(),
        }
        .into();
        assert!(matches!(err, SurakshaError::DispatchFailed(_)));
        assert!(err.to_string().contains("Twilio down"));
    }

    #[test]
    fn test_error_display_messages() {
        let err = SurakshaError::BluetoothAdapterNotFound;
        assert!(format!("{err}").contains("No Bluetooth adapter found"));

        let err = SurakshaError::AuthenticationRequired;
        assert!(format!("{err}").contains("Authentication required"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SurakshaError>();
        assert_sync::<SurakshaError>();
    }
}
