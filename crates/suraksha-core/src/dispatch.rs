//! Emergency dispatch endpoint client.
//!
//! The backend relays the alert to the user's emergency contacts. One call is
//! made per attempt; retrying is left to the human pressing the button again.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;
use utoipa::ToSchema;

use crate::config::DispatchConfig;
use crate::location::Coordinates;

/// Path of the dispatch endpoint relative to the configured base URL.
pub const SEND_EMERGENCY_PATH: &str = "api/sendEmergency";

/// Errors raised while delivering an alert.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No base URL was configured.
    #[error("no dispatch endpoint configured (set dispatch.base_url)")]
    NotConfigured,

    /// The configured base URL cannot be extended with the endpoint path.
    #[error("invalid dispatch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Network {
        /// Endpoint that was called.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    #[error("backend rejected the alert ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error text supplied by the backend.
        message: String,
    },

    /// No response within the configured bound.
    #[error("no response from the dispatch endpoint within {secs} seconds")]
    Timeout {
        /// Configured bound.
        secs: u64,
    },
}

/// Body of `POST /api/sendEmergency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyPayload {
    /// Degrees north.
    #[schema(example = 12.9716)]
    pub latitude: f64,
    /// Degrees east.
    #[schema(example = 77.5946)]
    pub longitude: f64,
    /// Text forwarded to the emergency contacts.
    #[schema(example = "Emergency! Location: https://maps.google.com/?q=12.9716,77.5946")]
    pub message: String,
}

impl EmergencyPayload {
    /// Payload for `coordinates`, rendering `{latitude}` and `{longitude}` in
    /// `template`.
    #[must_use]
    pub fn new(coordinates: Coordinates, template: &str) -> Self {
        let message = template
            .replace("{latitude}", &coordinates.latitude.to_string())
            .replace("{longitude}", &coordinates.longitude.to_string());
        Self {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            message,
        }
    }
}

/// Delivers an emergency payload on behalf of an authenticated user.
pub trait EmergencyDispatcher: Send + Sync {
    /// Make exactly one delivery attempt.
    fn send<'a>(
        &'a self,
        payload: &'a EmergencyPayload,
        token: &'a str,
    ) -> BoxFuture<'a, Result<(), DispatchError>>;
}

/// Dispatcher calling the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpDispatcher {
    /// Dispatcher posting to `{base_url}/api/sendEmergency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be extended or the client cannot be
    /// built.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, DispatchError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(SEND_EMERGENCY_PATH)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DispatchError::Client)?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Build from the `[dispatch]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NotConfigured`] without a base URL.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let base_url = config.base_url.as_ref().ok_or(DispatchError::NotConfigured)?;
        Self::new(base_url, config.timeout())
    }

    /// Full endpoint URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The request [`EmergencyDispatcher::send`] issues.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the request cannot be assembled.
    pub fn build_request(
        &self,
        payload: &EmergencyPayload,
        token: &str,
    ) -> reqwest::Result<reqwest::Request> {
        self.client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(payload)
            .build()
    }
}

impl EmergencyDispatcher for HttpDispatcher {
    fn send<'a>(
        &'a self,
        payload: &'a EmergencyPayload,
        token: &'a str,
    ) -> BoxFuture<'a, Result<(), DispatchError>> {
        async move {
            let url = self.endpoint.to_string();
            let request = self
                .build_request(payload, token)
                .map_err(|source| DispatchError::Network {
                    url: url.clone(),
                    source,
                })?;

            let response = self.client.execute(request).await.map_err(|source| {
                if source.is_timeout() {
                    DispatchError::Timeout {
                        secs: self.timeout.as_secs(),
                    }
                } else {
                    DispatchError::Network {
                        url: url.clone(),
                        source,
                    }
                }
            })?;

            let status = response.status();
            debug!(%url, status = status.as_u16(), "Dispatch endpoint answered");
            if status.is_success() {
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            Err(DispatchError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            })
        }
        .boxed()
    }
}

/// Text to surface for a non-2xx answer: the backend's `error` field, else the
/// raw body, else the status reason.
fn rejection_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        });

    from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}
