//! Read-only dashboard endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use super::AppState;
use crate::store::{Backend, Stats, StoreError};
use crate::types::Event;

/// Number of events returned by `GET /events/recent`.
pub const RECENT_EVENTS_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "API request failed");
        let status = match &self {
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// `GET /events/recent`: the newest events, newest first.
pub async fn recent_events_handler<B: Backend>(
    State(app_state): State<AppState<B>>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = app_state.store().recent(RECENT_EVENTS_LIMIT).await?;
    Ok(Json(events))
}

/// `GET /stats`: aggregate counts over the recent window.
pub async fn stats_handler<B: Backend>(
    State(app_state): State<AppState<B>>,
) -> Result<Json<Stats>, ApiError> {
    let stats = app_state.store().statistics().await?;
    Ok(Json(stats))
}
