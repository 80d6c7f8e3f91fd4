//! Bounded recent-event store.
//!
//! Events are kept as their JSON wire form in a capped, newest-first list on
//! the backing store, and published on a channel for the broadcast hub.
//!
//! # Layout
//!
//! ```text
//! recent-events   list, index 0 = newest, at most RECENT_CAPACITY entries
//! git-events      pub/sub channel carrying each new event
//! ```
//!
//! Every backend call goes through the store's [`RetryPolicy`].

pub mod backend;
pub mod redis_backend;
pub mod retry;
pub mod stats;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::types::Event;

pub use backend::{Backend, BackendError, MemoryBackend, MemorySubscription, Subscription};
pub use redis_backend::{RedisBackend, RedisSubscription, redis_url};
pub use retry::{RetriesExhausted, RetryPolicy};
pub use stats::{Stats, compute_stats};

/// Maximum number of events retained in the recent window.
pub const RECENT_CAPACITY: usize = 100;

/// List key holding the recent window.
pub const RECENT_EVENTS_KEY: &str = "recent-events";

/// Channel new events are published on.
pub const EVENTS_CHANNEL: &str = "git-events";

/// Errors surfaced by the event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend kept failing until the retry policy gave up.
    #[error(transparent)]
    Backend(#[from] RetriesExhausted),

    /// The event could not be encoded.
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Capped, newest-first event history on top of a [`Backend`].
pub struct EventStore<B> {
    backend: Arc<B>,
    retry: RetryPolicy,
    /// Serializes push-then-trim so concurrent appends cannot interleave.
    append_lock: Mutex<()>,
}

impl<B: Backend> EventStore<B> {
    /// Creates a store with the default retry policy.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_retry(backend, RetryPolicy::DEFAULT)
    }

    pub fn with_retry(backend: Arc<B>, retry: RetryPolicy) -> Self {
        EventStore {
            backend,
            retry,
            append_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Adds `event` to the front of the recent window, trimming to capacity.
    ///
    /// The event is visible to [`EventStore::recent`] once this returns `Ok`.
    /// A retried attempt may push the same event again if an earlier attempt
    /// failed after its push.
    pub async fn append(&self, event: &Event) -> Result<(), StoreError> {
        let payload = event.to_json()?;
        let _guard = self.append_lock.lock().await;

        self.retry
            .run("append", || async {
                self.backend
                    .push_front(RECENT_EVENTS_KEY, payload.clone())
                    .await?;
                self.backend
                    .trim(RECENT_EVENTS_KEY, 0, RECENT_CAPACITY - 1)
                    .await
            })
            .await?;

        debug!(event_id = %event.id, "Event appended to recent window");
        Ok(())
    }

    /// Publishes `event` on the fan-out channel.
    ///
    /// Returns the number of subscribers that received it.
    pub async fn publish(&self, event: &Event) -> Result<usize, StoreError> {
        let payload = event.to_json()?;
        let receivers = self
            .retry
            .run("publish", || {
                self.backend.publish(EVENTS_CHANNEL, payload.clone())
            })
            .await?;

        info!(event_id = %event.id, receivers, "Published event");
        Ok(receivers)
    }

    /// Returns up to `n` of the most recent events, newest first.
    ///
    /// Never returns more than [`RECENT_CAPACITY`] events. Stored records that
    /// fail to decode are skipped.
    pub async fn recent(&self, n: usize) -> Result<Vec<Event>, StoreError> {
        let n = n.min(RECENT_CAPACITY);
        if n == 0 {
            return Ok(Vec::new());
        }

        let raw = self
            .retry
            .run("read-recent", || {
                self.backend.range(RECENT_EVENTS_KEY, 0, n - 1)
            })
            .await?;

        Ok(decode_events(raw))
    }

    /// Computes dashboard statistics over the whole recent window.
    pub async fn statistics(&self) -> Result<Stats, StoreError> {
        let raw = self
            .retry
            .run("read-stats", || {
                self.backend
                    .range(RECENT_EVENTS_KEY, 0, RECENT_CAPACITY - 1)
            })
            .await?;

        Ok(compute_stats(&decode_events(raw), Utc::now()))
    }

    /// Subscribes to the fan-out channel.
    pub async fn subscribe(&self) -> Result<B::Subscription, StoreError> {
        let subscription = self
            .retry
            .run("subscribe", || self.backend.subscribe(EVENTS_CHANNEL))
            .await?;
        Ok(subscription)
    }
}

fn decode_events(raw: Vec<String>) -> Vec<Event> {
    raw.into_iter()
        .filter_map(|record| match Event::from_json(&record) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable stored event");
                None
            }
        })
        .collect()
}
