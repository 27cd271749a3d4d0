//! Shared types and OpenAPI schemas.
//!
//! Most API types live next to the logic they describe (monitor, events,
//! emergency).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::monitor::MonitorState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Monitor lifecycle state; `stopped` once the monitor task is gone.
    pub monitor: MonitorState,
}
