//! Geographic position source used when an emergency alert is sent.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::LocationConfig;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    /// Degrees north.
    #[schema(example = 12.9716)]
    pub latitude: f64,
    /// Degrees east.
    #[schema(example = 77.5946)]
    pub longitude: f64,
}

/// Why no position could be obtained.
#[derive(Debug, Clone, Error)]
pub enum LocationError {
    /// The platform refused location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// No fix is available.
    #[error("location unavailable: {0}")]
    Unavailable(String),

    /// The lookup did not finish in time.
    #[error("location lookup timed out after {secs} seconds")]
    Timeout {
        /// Configured bound.
        secs: u64,
    },
}

/// Provides the device's current position.
pub trait PositionProvider: Send + Sync {
    /// Ask the platform for location access. `false` means denied.
    fn request_permission(&self) -> BoxFuture<'_, bool>;

    /// One position lookup; callers do not retry.
    fn current_position(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>>;
}

/// Position configured for a stationary installation.
#[derive(Debug, Clone, Default)]
pub struct FixedPosition {
    coordinates: Option<Coordinates>,
}

impl FixedPosition {
    /// Always report `coordinates`.
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates: Some(coordinates),
        }
    }

    /// Report `Unavailable` on every lookup.
    #[must_use]
    pub const fn unset() -> Self {
        Self { coordinates: None }
    }

    /// Build from the `[location]` configuration section.
    #[must_use]
    pub fn from_config(config: &LocationConfig) -> Self {
        match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Self::new(Coordinates {
                latitude,
                longitude,
            }),
            _ => Self::unset(),
        }
    }
}

impl PositionProvider for FixedPosition {
    fn request_permission(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }

    fn current_position(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>> {
        let result = self.coordinates.ok_or_else(|| {
            LocationError::Unavailable("no position configured under [location]".to_string())
        });
        async move { result }.boxed()
    }
}
