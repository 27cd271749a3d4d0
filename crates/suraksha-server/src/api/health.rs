//! Health check API endpoint.
//!
//! Provides a simple health check endpoint for monitoring and process
//! supervisors.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use suraksha_core::{HealthResponse, MonitorState};

use crate::state::SharedState;

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
///
/// Returns the service version and the monitor's lifecycle state. The
/// service reports `degraded` once the monitor task has stopped.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns basic service status information, including whether the \
        panic button monitor is still running.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let monitor = state
        .monitor()
        .status()
        .await
        .map_or(MonitorState::Stopped, |status| status.state);

    let status = if monitor == MonitorState::Stopped {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        monitor,
    })
}
