//! HTTP and WebSocket surface.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Ingests a GitHub webhook delivery
//! - `GET /ws` - Live event stream, seeded with the 10 most recent events
//! - `GET /events/recent` - The 50 most recent events as JSON
//! - `GET /stats` - Dashboard statistics as JSON
//! - `GET /` - Health check

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod health;
pub mod webhook;
pub mod ws;

pub use api::{recent_events_handler, stats_handler};
pub use health::health_handler;
pub use webhook::webhook_handler;
pub use ws::ws_handler;

use crate::hub::{Hub, WsConnection};
use crate::ingest::Ingest;
use crate::store::{Backend, EventStore};
use crate::webhooks::WebhookSecret;

/// Shared application state, handed to every handler via `State`.
pub struct AppState<B> {
    inner: Arc<AppStateInner<B>>,
}

struct AppStateInner<B> {
    ingest: Ingest<B>,
    hub: Arc<Hub<WsConnection>>,
    webhook_secret: WebhookSecret,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> AppState<B> {
    pub fn new(
        store: Arc<EventStore<B>>,
        hub: Arc<Hub<WsConnection>>,
        webhook_secret: WebhookSecret,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                ingest: Ingest::new(store),
                hub,
                webhook_secret,
            }),
        }
    }

    pub fn ingest(&self) -> &Ingest<B> {
        &self.inner.ingest
    }

    pub fn store(&self) -> &Arc<EventStore<B>> {
        self.inner.ingest.store()
    }

    pub fn hub(&self) -> &Arc<Hub<WsConnection>> {
        &self.inner.hub
    }

    pub fn webhook_secret(&self) -> &WebhookSecret {
        &self.inner.webhook_secret
    }
}

/// Builds the router with all endpoints, permissive CORS and request tracing.
pub fn build_router<B: Backend>(app_state: AppState<B>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", get(health_handler))
        .route("/webhook", post(webhook_handler::<B>))
        .route("/ws", get(ws_handler::<B>))
        .route("/events/recent", get(recent_events_handler::<B>))
        .route("/stats", get(stats_handler::<B>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::store::{MemoryBackend, RetryPolicy, Stats};
    use crate::test_utils::FlakyBackend;
    use crate::types::Event;
    use crate::webhooks::{compute_signature, format_signature_header};

    fn test_app_state(secret: &[u8]) -> AppState<MemoryBackend> {
        AppState::new(
            Arc::new(EventStore::new(Arc::new(MemoryBackend::new()))),
            Arc::new(Hub::new()),
            WebhookSecret::new(secret),
        )
    }

    fn webhook_request(secret: &[u8], event_type: &str, body: &Value) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let signature = format_signature_header(&compute_signature(&body_bytes, secret));

        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-hub-signature-256", signature)
            .body(Body::from(body_bytes))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn push_body(branch: &str, files: &[&str]) -> Value {
        json!({
            "ref": format!("refs/heads/{branch}"),
            "pusher": {"name": "alice"},
            "sender": {"login": "alice"},
            "repository": {"full_name": "acme/widgets"},
            "commits": [{"modified": files}]
        })
    }

    // ─── Health ───

    #[tokio::test]
    async fn root_reports_running() {
        let app = build_router(test_app_state(b""));
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "running", "service": "git-collaboration-monitor"})
        );
    }

    // ─── Webhook ───

    #[tokio::test]
    async fn signed_webhook_is_received_and_stored() {
        let secret = b"test-secret";
        let state = test_app_state(secret);
        let app = build_router(state.clone());

        let response = app
            .oneshot(webhook_request(secret, "push", &push_body("main", &["a.rs"])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "received", "event_type": "push"})
        );

        let stored = state.store().recent(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].files_changed, vec!["a.rs"]);
    }

    #[tokio::test]
    async fn bad_signature_is_forbidden() {
        let state = test_app_state(b"right");
        let app = build_router(state.clone());

        let response = app
            .oneshot(webhook_request(b"wrong", "push", &push_body("main", &["a.rs"])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.store().recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_signature_is_forbidden_when_secret_set() {
        let app = build_router(test_app_state(b"secret"));
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", "push")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_secret_skips_verification_and_event_defaults_to_ping() {
        let state = test_app_state(b"");
        let app = build_router(state.clone());
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(r#"{"zen": "Keep it logically awesome."}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "received", "event_type": "ping"})
        );
        let stored = state.store().recent(1).await.unwrap();
        assert_eq!(stored[0].title, "someone triggered ping event");
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let app = build_router(test_app_state(b""));
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", "push")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn total_store_failure_is_server_error() {
        let backend = Arc::new(FlakyBackend::new());
        let state = AppState::new(
            Arc::new(EventStore::with_retry(backend.clone(), RetryPolicy::NO_RETRY)),
            Arc::new(Hub::new()),
            WebhookSecret::default(),
        );
        backend.fail_writes(1);
        backend.fail_publishes(1);

        let response = build_router(state)
            .oneshot(webhook_request(b"", "issues", &json!({"action": "opened"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn partial_store_failure_is_still_received() {
        let backend = Arc::new(FlakyBackend::new());
        let state = AppState::new(
            Arc::new(EventStore::with_retry(backend.clone(), RetryPolicy::NO_RETRY)),
            Arc::new(Hub::new()),
            WebhookSecret::default(),
        );
        backend.fail_publishes(1);

        let response = build_router(state)
            .oneshot(webhook_request(b"", "issues", &json!({"action": "opened"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    // ─── Read endpoints ───

    #[tokio::test]
    async fn recent_events_returns_newest_fifty() {
        let state = test_app_state(b"");
        for i in 0..55 {
            state
                .ingest()
                .handle("create", &json!({"ref": format!("b{i}"), "sender": {"login": "x"}}))
                .await
                .unwrap();
        }

        let response = build_router(state).oneshot(get("/events/recent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events: Vec<Event> = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(events.len(), 50);
        assert_eq!(events[0].branch, "b54");
        assert_eq!(events[49].branch, "b5");
    }

    #[tokio::test]
    async fn stats_reflect_ingested_events() {
        let state = test_app_state(b"");
        state
            .ingest()
            .handle("push", &push_body("feature-x", &["a.py"]))
            .await
            .unwrap();
        state
            .ingest()
            .handle("push", &push_body("feature-y", &["a.py"]))
            .await
            .unwrap();

        let response = build_router(state).oneshot(get("/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stats: Stats = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(
            stats,
            Stats {
                total_events_today: 2,
                active_contributors: 1,
                branches_modified: 2,
                conflict_alerts: 1,
            }
        );
    }

    #[tokio::test]
    async fn stats_failure_is_server_error() {
        let backend = Arc::new(FlakyBackend::new());
        let state = AppState::new(
            Arc::new(EventStore::with_retry(backend.clone(), RetryPolicy::NO_RETRY)),
            Arc::new(Hub::new()),
            WebhookSecret::default(),
        );
        backend.fail_reads(1);

        let response = build_router(state).oneshot(get("/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let app = build_router(test_app_state(b""));
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/stats")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }
}
