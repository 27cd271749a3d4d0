//! Manual emergency trigger.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use suraksha_core::EmergencyReceipt;
use tracing::warn;
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Emergency alert accepted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "latitude": 12.9716,
    "longitude": 77.5946,
    "message": "Emergency! Location: https://maps.google.com/?q=12.9716,77.5946",
    "sent_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct EmergencyResponse {
    /// Degrees north included in the alert.
    pub latitude: f64,
    /// Degrees east included in the alert.
    pub longitude: f64,
    /// Text forwarded to the emergency contacts.
    pub message: String,
    /// When the backend accepted the alert (ISO 8601).
    pub sent_at_utc: String,
}

impl From<EmergencyReceipt> for EmergencyResponse {
    fn from(receipt: EmergencyReceipt) -> Self {
        Self {
            latitude: receipt.coordinates.latitude,
            longitude: receipt.coordinates.longitude,
            message: receipt.message,
            sent_at_utc: receipt.sent_at.to_rfc3339(),
        }
    }
}

/// Send an emergency alert immediately.
///
/// Runs the same procedure as a triple press: credential, location, one
/// dispatch call. The outcome is also published on the event stream.
#[utoipa::path(
    post,
    path = "/api/emergency",
    tag = "emergency",
    operation_id = "triggerEmergency",
    summary = "Send an emergency alert",
    description = "Sends the user's location to their emergency contacts, exactly as a \
        triple press of the panic button would. Not retried on failure.",
    responses(
        (status = 200, description = "Alert accepted by the backend", body = EmergencyResponse),
        (status = 401, description = "No credential stored", body = crate::api::error::ErrorResponse),
        (status = 502, description = "Location or dispatch failed", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn trigger_emergency(
    State(state): State<SharedState>,
) -> ApiResult<Json<EmergencyResponse>> {
    warn!("Emergency alert triggered over the API");
    let receipt = state.monitor().trigger_emergency().await?;
    Ok(Json(receipt.into()))
}
