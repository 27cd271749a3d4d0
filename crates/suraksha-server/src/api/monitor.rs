//! Monitor API endpoints.
//!
//! Exposes the monitor's status and the two inputs the host application
//! feeds it: foreground transitions and explicit rescans.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use suraksha_core::{AppState, MonitorStatus};
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for reporting an app state change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "state": "active" }))]
pub struct AppStateRequest {
    /// New foreground state of the host application.
    pub state: AppState,
}

// ============================================================================
// Router
// ============================================================================

/// Creates the monitor router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_status))
        .route("/app-state", put(update_app_state))
        .route("/rescan", post(rescan))
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the monitor's current status.
#[utoipa::path(
    get,
    path = "/api/monitor",
    tag = "monitor",
    operation_id = "getMonitorStatus",
    summary = "Get panic button monitor status",
    description = "Returns the lifecycle state (idle, scanning, connecting, monitoring, stopped), \
        the connected peripheral, the presses counted in the burst still open and whether \
        a rescan is scheduled.",
    responses(
        (status = 200, description = "Current status", body = MonitorStatus),
        (status = 503, description = "Monitor stopped", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> ApiResult<Json<MonitorStatus>> {
    Ok(Json(state.monitor().status().await?))
}

/// Report a foreground transition of the host application.
#[utoipa::path(
    put,
    path = "/api/monitor/app-state",
    tag = "monitor",
    operation_id = "updateAppState",
    summary = "Report app foreground state",
    description = "Returning to `active` from `inactive` or `background` restarts the scan \
        when the panic button is not connected. An established connection is kept.",
    request_body = AppStateRequest,
    responses(
        (status = 200, description = "Transition applied", body = MonitorStatus),
        (status = 503, description = "Monitor stopped", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn update_app_state(
    State(state): State<SharedState>,
    Json(request): Json<AppStateRequest>,
) -> ApiResult<Json<MonitorStatus>> {
    let monitor = state.monitor();
    monitor.app_state_changed(request.state).await?;
    Ok(Json(monitor.status().await?))
}

/// Restart scanning for the panic button.
#[utoipa::path(
    post,
    path = "/api/monitor/rescan",
    tag = "monitor",
    operation_id = "rescan",
    summary = "Restart scanning",
    description = "Stops any scan in progress and starts a fresh one. Ignored while the panic \
        button is connecting or connected.",
    responses(
        (status = 200, description = "Scan restarted (or ignored)", body = MonitorStatus),
        (status = 503, description = "Monitor stopped", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn rescan(State(state): State<SharedState>) -> ApiResult<Json<MonitorStatus>> {
    let monitor = state.monitor();
    info!("Rescan requested over the API");
    monitor.start_scanning().await?;
    Ok(Json(monitor.status().await?))
}
