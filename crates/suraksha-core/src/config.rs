//! Application configuration management.
//!
//! Handles loading and validating suraksha configuration including:
//! - The panic button's advertised name, GATT service and characteristic
//! - Debounce, safety-net and backoff timings
//! - The emergency dispatch endpoint (never hard-coded)
//! - Location and credential sources
//!
//! Values are layered: built-in defaults, then a TOML file, then environment
//! variables of the form `SURAKSHA__SECTION__KEY` (for example
//! `SURAKSHA__DISPATCH__BASE_URL=https://alerts.example.org`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Name the panic button firmware advertises.
pub const DEFAULT_DEVICE_NAME: &str = "ESP32 Button BLE";

/// GATT service exposed by the panic button firmware.
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x1234_5678_1234_1234_1234_1234_5678_90ab);

/// Notification characteristic the firmware writes on every press.
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xabcd_1234_5678_90ab_cdef_1234_5678_90ab);

/// Payload pattern of a single button press.
pub const DEFAULT_PRESS_PATTERN: &str = "^Button Pressed!$";

/// Default emergency message; `{latitude}` and `{longitude}` are substituted.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Emergency! Location: https://maps.google.com/?q={latitude},{longitude}";

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "SURAKSHA";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration sources could not be merged or deserialized.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] ::config::ConfigError),

    /// A single field holds an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Panic button identity.
    pub device: DeviceConfig,
    /// Monitor timings.
    pub timing: TimingConfig,
    /// Emergency dispatch endpoint.
    pub dispatch: DispatchConfig,
    /// Position source.
    pub location: LocationConfig,
    /// Bearer credential source.
    pub credentials: CredentialsConfig,
    /// HTTP API settings.
    pub server: ServerConfig,
}

/// Identity of the BLE panic button.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Advertised name; only an exact match is ever connected.
    pub name: String,
    /// GATT service carrying the press characteristic.
    pub service_uuid: Uuid,
    /// Characteristic whose notifications signal presses.
    pub characteristic_uuid: Uuid,
    /// Regular expression a trimmed notification must match to count as a press.
    pub press_pattern: String,
    /// Ask the radio to only report peripherals advertising `service_uuid`.
    ///
    /// Off by default: cheap button firmwares often leave the service out of
    /// their advertisement.
    pub filter_by_service: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            service_uuid: DEFAULT_SERVICE_UUID,
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            press_pattern: DEFAULT_PRESS_PATTERN.to_string(),
            filter_by_service: false,
        }
    }
}

impl DeviceConfig {
    /// Compile the press pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the pattern is malformed.
    pub fn press_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.press_pattern)
    }
}

/// Timings of the monitor state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet period after the last press before the burst is classified.
    pub debounce_ms: u64,
    /// Unconditional rescan after a scan was started.
    pub scan_safety_net_secs: u64,
    /// Delay before rescanning after a failed connection attempt.
    pub connect_backoff_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            scan_safety_net_secs: 60,
            connect_backoff_secs: 3,
        }
    }
}

impl TimingConfig {
    /// Debounce window as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Safety-net rescan delay as a [`Duration`].
    #[must_use]
    pub const fn scan_safety_net(&self) -> Duration {
        Duration::from_secs(self.scan_safety_net_secs)
    }

    /// Connection backoff as a [`Duration`].
    #[must_use]
    pub const fn connect_backoff(&self) -> Duration {
        Duration::from_secs(self.connect_backoff_secs)
    }
}

/// Emergency dispatch endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Base URL of the backend; `/api/sendEmergency` is appended.
    pub base_url: Option<Url>,
    /// Upper bound for one dispatch request.
    pub timeout_secs: u64,
    /// Message sent with the coordinates.
    pub message_template: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Dispatch timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Position source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixed latitude for stationary installations.
    pub latitude: Option<f64>,
    /// Fixed longitude for stationary installations.
    pub longitude: Option<f64>,
    /// Upper bound for one position lookup.
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            timeout_secs: 5,
        }
    }
}

impl LocationConfig {
    /// Position lookup timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Bearer credential settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// File holding the session token written at login.
    pub token_file: Option<PathBuf>,
    /// Token supplied directly, typically through `SURAKSHA__CREDENTIALS__TOKEN`.
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on.
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3030)),
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `Some(path)` the file must exist. With `None` the platform default
    /// path is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or the merged
    /// configuration fails validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(::config::File::from(path).required(true)),
            None => Self::default_path().map(|p| ::config::File::from(p).required(false)),
        };

        let mut builder = ::config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(content, ::config::FileFormat::Toml))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Platform default location of the configuration file.
    ///
    /// On Linux: `/etc/suraksha/config.toml`; elsewhere the per-user config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Some(PathBuf::from("/etc/suraksha/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "suraksha")
                .map(|dirs| dirs.config_dir().join("config.toml"))
        }
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: String| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message,
            });
        };

        if self.device.name.trim().is_empty() {
            invalid("device.name", "must not be empty".to_string());
        }
        if let Err(e) = self.device.press_regex() {
            invalid("device.press_pattern", format!("invalid regular expression: {e}"));
        }

        if self.timing.debounce_ms == 0 {
            invalid("timing.debounce_ms", "must be greater than zero".to_string());
        }
        if self.timing.scan_safety_net_secs == 0 {
            invalid(
                "timing.scan_safety_net_secs",
                "must be greater than zero".to_string(),
            );
        }
        if self.timing.connect_backoff_secs == 0 {
            invalid(
                "timing.connect_backoff_secs",
                "must be greater than zero".to_string(),
            );
        }

        match &self.dispatch.base_url {
            None => invalid(
                "dispatch.base_url",
                "must be set to the backend that relays emergency alerts".to_string(),
            ),
            Some(url) if !matches!(url.scheme(), "http" | "https") => invalid(
                "dispatch.base_url",
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
            ),
            Some(_) => {}
        }
        if self.dispatch.timeout_secs == 0 {
            invalid("dispatch.timeout_secs", "must be greater than zero".to_string());
        }
        if self.dispatch.message_template.trim().is_empty() {
            invalid("dispatch.message_template", "must not be empty".to_string());
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    invalid("location.latitude", format!("{lat} is outside -90..=90"));
                }
                if !(-180.0..=180.0).contains(&lon) {
                    invalid("location.longitude", format!("{lon} is outside -180..=180"));
                }
            }
            (None, None) => {}
            _ => invalid(
                "location",
                "latitude and longitude must be set together".to_string(),
            ),
        }
        if self.location.timeout_secs == 0 {
            invalid("location.timeout_secs", "must be greater than zero".to_string());
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}
