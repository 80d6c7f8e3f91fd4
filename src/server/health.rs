//! Health check endpoint.

use axum::Json;
use serde::Serialize;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "git-collaboration-monitor";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
}

/// Returns `{"status": "running", "service": "git-collaboration-monitor"}`.
pub async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "running",
        service: SERVICE_NAME,
    })
}
