//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `health` - Service health checks
//! - `monitor` - Monitor status, app state and rescans
//! - `events` - Server-sent monitor events
//! - `emergency` - Manual emergency trigger
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod emergency;
pub mod error;
pub mod events;
pub mod health;
pub mod monitor;
pub mod openapi;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /api
/// ├── /monitor           - Monitor status
/// │   ├── /app-state     - Foreground transitions (PUT)
/// │   └── /rescan        - Restart scanning (POST)
/// ├── /events            - Server-sent monitor events
/// ├── /emergency         - Send an emergency alert (POST)
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/monitor", monitor::router())
                .route("/events", get(events::stream_events))
                .route("/emergency", post(emergency::trigger_emergency))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
