//! The emergency procedure: credential, position, one dispatch call.
//!
//! Every attempt ends in exactly one [`MonitorEvent::EmergencySent`] or
//! [`MonitorEvent::EmergencyError`]. Attempts are independent, so a failed
//! one never affects the next.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::config::{Config, DEFAULT_MESSAGE_TEMPLATE};
use crate::credentials::CredentialStore;
use crate::dispatch::{DispatchError, EmergencyDispatcher, EmergencyPayload};
use crate::error::{Result, SurakshaError};
use crate::events::{EmergencyErrorKind, EventBus, MonitorEvent};
use crate::location::{Coordinates, LocationError, PositionProvider};

/// Default bound on the location lookup.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on the dispatch call.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Record of an alert the backend accepted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmergencyReceipt {
    /// Position included in the alert.
    pub coordinates: Coordinates,
    /// Text forwarded to the emergency contacts.
    pub message: String,
    /// When the backend accepted the alert.
    pub sent_at: DateTime<Utc>,
}

/// Sends emergency alerts and reports the outcome on the event bus.
pub struct EmergencyService {
    positions: Arc<dyn PositionProvider>,
    credentials: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn EmergencyDispatcher>,
    events: EventBus,
    message_template: String,
    location_timeout: Duration,
    dispatch_timeout: Duration,
}

impl std::fmt::Debug for EmergencyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyService")
            .field("message_template", &self.message_template)
            .field("location_timeout", &self.location_timeout)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish_non_exhaustive()
    }
}

impl EmergencyService {
    /// Service with default template and timeouts.
    pub fn new(
        positions: Arc<dyn PositionProvider>,
        credentials: Arc<dyn CredentialStore>,
        dispatcher: Arc<dyn EmergencyDispatcher>,
        events: EventBus,
    ) -> Self {
        Self {
            positions,
            credentials,
            dispatcher,
            events,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    /// Apply the template and timeouts from `config`.
    #[must_use]
    pub fn configured(mut self, config: &Config) -> Self {
        self.message_template.clone_from(&config.dispatch.message_template);
        self.location_timeout = config.location.timeout();
        self.dispatch_timeout = config.dispatch.timeout();
        self
    }

    /// Override the message template.
    #[must_use]
    pub fn with_message_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    /// Override the location and dispatch bounds.
    #[must_use]
    pub const fn with_timeouts(mut self, location: Duration, dispatch: Duration) -> Self {
        self.location_timeout = location;
        self.dispatch_timeout = dispatch;
        self
    }

    /// The bus outcomes are published on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Ask for location access ahead of the first alert.
    pub async fn request_location_permission(&self) -> bool {
        self.positions.request_permission().await
    }

    /// Run the procedure once and publish the outcome.
    ///
    /// # Errors
    ///
    /// [`SurakshaError::AuthenticationRequired`] when no credential is stored
    /// (nothing is sent), [`SurakshaError::DispatchFailed`] for every other
    /// failure.
    pub async fn trigger(&self) -> Result<EmergencyReceipt> {
        info!("Sending emergency alert");
        let result = self.send().await;

        match &result {
            Ok(receipt) => {
                info!(
                    latitude = receipt.coordinates.latitude,
                    longitude = receipt.coordinates.longitude,
                    "Emergency alert sent"
                );
                self.events.emit(MonitorEvent::EmergencySent);
            }
            Err(e) => {
                error!(error = %e, "Emergency alert failed");
                let kind = match e {
                    SurakshaError::AuthenticationRequired => EmergencyErrorKind::AuthenticationRequired,
                    _ => EmergencyErrorKind::DispatchFailed,
                };
                self.events.emit(MonitorEvent::EmergencyError {
                    kind,
                    detail: e.to_string(),
                });
            }
        }

        result
    }

    async fn send(&self) -> Result<EmergencyReceipt> {
        let token = self
            .credentials
            .auth_token()
            .await
            .ok_or(SurakshaError::AuthenticationRequired)?;

        let coordinates = timeout(self.location_timeout, self.positions.current_position())
            .await
            .map_err(|_| LocationError::Timeout {
                secs: self.location_timeout.as_secs(),
            })
            .and_then(|lookup| lookup)
            .map_err(|e| SurakshaError::DispatchFailed(e.to_string()))?;

        let payload = EmergencyPayload::new(coordinates, &self.message_template);

        timeout(self.dispatch_timeout, self.dispatcher.send(&payload, &token))
            .await
            .map_err(|_| DispatchError::Timeout {
                secs: self.dispatch_timeout.as_secs(),
            })??;

        Ok(EmergencyReceipt {
            coordinates,
            message: payload.message,
            sent_at: Utc::now(),
        })
    }
}
