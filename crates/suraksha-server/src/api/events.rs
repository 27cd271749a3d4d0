//! Server-sent event stream of monitor events.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use futures::StreamExt;
use serde::Deserialize;
use suraksha_core::{EventKind, Subscription};
use tracing::debug;
use utoipa::IntoParams;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Query parameters for the event stream.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Comma-separated event kinds to receive (for example
    /// `triplePress,emergencySent`). All kinds when omitted.
    pub kinds: Option<String>,
}

fn parse_kinds(raw: &str) -> ApiResult<Vec<EventKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<EventKind>().map_err(|e| ApiError::BadRequest {
                error_code: "unknown_event_kind".to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn into_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(subscription, |mut subscription| async move {
        let event = subscription.recv().await?;
        Some((event, subscription))
    })
    .map(|event| {
        Event::default()
            .event(event.kind().as_str())
            .json_data(&event)
    })
}

/// Stream monitor events as they happen.
///
/// Each SSE message is named after the event kind and carries the event as
/// JSON. The stream ends when the server shuts down.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    operation_id = "streamEvents",
    summary = "Stream monitor events",
    description = "Server-sent events: deviceConnected, deviceDisconnected, doublePress, \
        triplePress, pressesDetected, emergencySent, emergencyError. Use `kinds` to \
        receive a subset.",
    params(EventsQuery),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = suraksha_core::MonitorEvent),
        (status = 400, description = "Unknown event kind", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn stream_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let kinds = query.kinds.as_deref().map(parse_kinds).transpose()?;
    let subscription = match kinds {
        Some(kinds) if !kinds.is_empty() => {
            debug!(?kinds, "Event stream opened");
            state.monitor().subscribe_to(kinds)
        }
        _ => {
            debug!("Event stream opened for every kind");
            state.monitor().subscribe()
        }
    };

    Ok(Sse::new(into_stream(subscription)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}
