//! CloudEvents receiver.
//!
//! Accepts both binary mode (`ce-*` headers, payload in the body) and
//! structured mode (`application/cloudevents+json`). Each request is handed
//! to the [`EventDispatcher`]; handling and its logging happen there.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tracing::warn;
use trigger::{EventDispatcher, EventEnvelope, TriggerError, STRUCTURED_CONTENT_TYPE};

use crate::error::EventRejection;

/// Shared state of the event router.
#[derive(Debug, Clone)]
pub struct EventState {
    pub dispatcher: Arc<EventDispatcher>,
}

/// Builds `POST /events` and `GET /health`.
pub fn build_event_router(state: EventState) -> Router {
    Router::new()
        .route("/events", post(receive_event))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> StatusCode {
    StatusCode::OK
}

async fn receive_event(
    State(state): State<EventState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, EventRejection> {
    let envelope = envelope_from_request(&headers, &body)
        .inspect_err(|e| warn!(stage = e.stage(), error = %e, "Event rejected"))?;
    state.dispatcher.handle(&envelope).await?;
    Ok(StatusCode::ACCEPTED)
}

fn is_structured(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(STRUCTURED_CONTENT_TYPE))
}

fn envelope_from_request(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<EventEnvelope, TriggerError> {
    if is_structured(headers) {
        return EventEnvelope::from_structured(body);
    }
    let pairs = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));
    Ok(EventEnvelope::from_binary(pairs, body))
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
