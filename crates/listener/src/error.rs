//! Mapping of domain errors onto HTTP responses.
//!
//! Error bodies are plain text carrying the error's display form.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use trigger::{RetryPolicy, TriggerError, WebhookError};

/// Rejection of an inbound event.
#[derive(Debug)]
pub struct EventRejection(pub TriggerError);

impl From<TriggerError> for EventRejection {
    fn from(err: TriggerError) -> Self {
        Self(err)
    }
}

impl EventRejection {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TriggerError::Submission { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for EventRejection {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.0.to_string()).into_response();
        if let RetryPolicy::Retryable { after: Some(after) } = self.0.retry_policy() {
            if let Ok(value) = HeaderValue::from_str(&after.as_secs().to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Failure of a webhook registration API call.
#[derive(Debug)]
pub struct WebhookApiError(pub WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl WebhookApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WebhookError::NotFound { .. } => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Webhook request failed");
        } else {
            tracing::warn!(error = %self.0, "Webhook request rejected");
        }
        (status, self.0.to_string()).into_response()
    }
}
