//! OpenAPI specification generation for the suraksha API.
//!
//! The generated document is consumed by the companion app to build its
//! HTTP client.

use axum::Json;
use utoipa::OpenApi;

use super::emergency::EmergencyResponse;
use super::error::ErrorResponse;
use super::monitor::AppStateRequest;
use suraksha_core::{
    AppState, EmergencyErrorKind, EventKind, HealthResponse, MonitorEvent, MonitorState,
    MonitorStatus,
};

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a string (for writing to file).
/// Used by the gen-openapi binary.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for suraksha.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "suraksha API",
        version = "0.1.0",
        description = r#"
# suraksha API

suraksha watches a BLE panic button and alerts the user's emergency contacts
when it is pressed three times in quick succession.

## Overview

1. **Monitor**: Scans for the button, keeps it connected and counts presses
2. **Events**: Streams what the monitor sees (connections, press bursts, alert outcomes)
3. **Emergency**: Sends an alert on demand, exactly as a triple press would

## Press bursts

Presses less than 500 ms apart form one burst. A burst of two is reported as
`doublePress`, three as `triplePress` (which sends the alert), anything else as
`pressesDetected`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local suraksha server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks"
        ),
        (
            name = "monitor",
            description = "Panic button discovery, connection and app state"
        ),
        (
            name = "events",
            description = "Live monitor events"
        ),
        (
            name = "emergency",
            description = "Emergency alert dispatch"
        )
    ),
    paths(
        super::health::health_check,
        super::monitor::get_status,
        super::monitor::update_app_state,
        super::monitor::rescan,
        super::events::stream_events,
        super::emergency::trigger_emergency,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Monitor types
            MonitorState,
            MonitorStatus,
            AppState,
            AppStateRequest,
            // Event types
            MonitorEvent,
            EventKind,
            EmergencyErrorKind,
            // Emergency types
            EmergencyResponse,
        )
    )
)]
pub struct ApiDoc;
