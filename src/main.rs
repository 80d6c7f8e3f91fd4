use std::sync::Arc;

use anyhow::Context;
use collab_monitor::config::Config;
use collab_monitor::hub::{Hub, spawn_listener};
use collab_monitor::server::{AppState, build_router};
use collab_monitor::store::{Backend, EventStore, MemoryBackend, RedisBackend};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collab_monitor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;
    if config.webhook_secret.is_disabled() {
        tracing::warn!("GITHUB_WEBHOOK_SECRET is not set, webhook signatures will not be checked");
    }

    match config.redis_url.clone() {
        Some(url) => {
            let backend = config
                .retry
                .run("connect", || RedisBackend::connect(&url))
                .await
                .with_context(|| format!("connecting to {url}"))?;
            tracing::info!(%url, "Using Redis backing store");
            serve(Arc::new(backend), config).await
        }
        None => {
            tracing::info!("REDIS_HOST is not set, keeping events in memory");
            serve(Arc::new(MemoryBackend::new()), config).await
        }
    }
}

/// Runs the listener and HTTP server on `backend` until shutdown.
async fn serve<B: Backend>(backend: Arc<B>, config: Config) -> anyhow::Result<()> {
    let store = Arc::new(EventStore::with_retry(backend, config.retry));
    let hub = Arc::new(Hub::new());

    let shutdown = CancellationToken::new();
    let subscription = store
        .subscribe()
        .await
        .context("subscribing to the event channel")?;
    let listener = spawn_listener(hub.clone(), subscription, shutdown.child_token());

    let app = build_router(AppState::new(store, hub.clone(), config.webhook_secret));

    let tcp = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!("listening on {}", config.bind);

    axum::serve(tcp, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                shutdown_signal(shutdown.clone()).await;
                // Open WebSockets would otherwise hold graceful shutdown open.
                shutdown.cancel();
                hub.close_all().await;
            }
        })
        .await
        .context("serving HTTP")?;

    if let Err(e) = listener.shutdown().await {
        tracing::error!(error = %e, "Fan-out listener stopped with an error");
    }
    tracing::info!("shut down");
    Ok(())
}

/// Resolves on Ctrl-C, or when `shutdown` is cancelled elsewhere.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                // Without a signal handler only an explicit cancel can stop us.
                shutdown.cancelled().await;
            }
        }
        _ = shutdown.cancelled() => {}
    }
    tracing::info!("shutdown requested");
}
