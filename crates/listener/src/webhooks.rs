//! Webhook registration REST API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use trigger::{Webhook, WebhookDefaults, WebhookRegistry};

use crate::error::WebhookApiError;
use crate::events::health;

#[derive(Debug, Clone)]
pub struct WebhookState {
    pub registry: Arc<WebhookRegistry>,
}

/// Builds `POST /webhooks/`, `GET /webhooks/`, `GET /webhooks/defaults` and
/// `GET /health`.
pub fn build_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/", get(list_webhooks).post(create_webhook))
        .route("/webhooks/defaults", get(get_defaults))
        .route("/health", get(health))
        .with_state(state)
}

async fn create_webhook(
    State(state): State<WebhookState>,
    Json(webhook): Json<Webhook>,
) -> Result<(StatusCode, Json<Webhook>), WebhookApiError> {
    let stored = state.registry.register(webhook).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_webhooks(
    State(state): State<WebhookState>,
) -> Result<Json<Vec<Webhook>>, WebhookApiError> {
    Ok(Json(state.registry.list().await?))
}

async fn get_defaults(State(state): State<WebhookState>) -> Json<WebhookDefaults> {
    Json(state.registry.defaults().clone())
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
