//! Webhook endpoint handler.
//!
//! Verifies the delivery's signature, parses the body, and runs it through the
//! ingest pipeline before acknowledging.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::AppState;
use crate::ingest::IngestError;
use crate::store::Backend;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Event kind assumed when the delivery does not name one.
const DEFAULT_EVENT: &str = "ping";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Neither storing nor publishing the event succeeded.
    #[error("{0}")]
    Ingest(#[from] IngestError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,
            WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            WebhookError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Received {
    pub status: &'static str,
    pub event_type: String,
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Headers:
///   - `X-GitHub-Event`: event kind, `ping` if absent
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature, required when a secret
///     is configured
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 200 OK: `{"status": "received", "event_type": "<kind>"}`
/// - 400 Bad Request: invalid JSON
/// - 403 Forbidden: invalid signature
/// - 500 Internal Server Error: the event could be neither stored nor published
pub async fn webhook_handler<B: Backend>(
    State(app_state): State<AppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Received>, WebhookError> {
    let event_kind = header(&headers, HEADER_EVENT).unwrap_or(DEFAULT_EVENT);
    let signature = header(&headers, HEADER_SIGNATURE).unwrap_or_default();

    // Verify before parsing anything.
    if !app_state.webhook_secret().verify(&body, signature) {
        warn!(event_kind, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)?;
    let repository = payload
        .pointer("/repository/full_name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    info!(event_kind, repository, "Webhook received");

    match app_state.ingest().handle(event_kind, &payload).await {
        Ok(_) => {}
        Err(e) if e.is_total() => return Err(e.into()),
        // Partial failures are already logged by ingest; the delivery still counts.
        Err(e) => warn!(event_id = %e.event().id, error = %e, "Webhook ingested with errors"),
    }

    Ok(Json(Received {
        status: "received",
        event_type: event_kind.to_string(),
    }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
