//! Backing store boundary: list storage plus publish/subscribe.
//!
//! The event store only needs a handful of list and channel primitives, so the
//! concrete backend is pluggable. [`MemoryBackend`] is the in-process
//! implementation used by the tests and by the binary when no Redis server is
//! configured; [`RedisBackend`](super::RedisBackend) keeps the window across
//! restarts and shares the channel between processes.

use std::collections::{HashMap, VecDeque};
use std::future::Future;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, trace};

/// Buffered messages per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Errors reported by a backend operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached or refused the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The channel's publisher side is gone.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// The subscriber fell behind and messages were dropped.
    #[error("subscription to {channel} lagged, {skipped} messages dropped")]
    SubscriptionLagged { channel: String, skipped: u64 },
}

/// List and channel primitives the event store is built on.
///
/// List indices are zero-based and inclusive at both ends, and index 0 is the
/// front (most recently pushed) element.
pub trait Backend: Send + Sync + 'static {
    /// Handle returned by [`Backend::subscribe`].
    type Subscription: Subscription;

    /// Inserts `value` at the front of the list at `key`.
    fn push_front(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Keeps only elements `start..=stop` of the list at `key`.
    fn trim(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Returns elements `start..=stop` of the list at `key` (clamped to its length).
    fn range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Publishes `message` on `channel`, returning how many subscribers received it.
    fn publish(
        &self,
        channel: &str,
        message: String,
    ) -> impl Future<Output = Result<usize, BackendError>> + Send;

    /// Subscribes to `channel`.
    fn subscribe(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<Self::Subscription, BackendError>> + Send;
}

/// A live subscription to one channel.
pub trait Subscription: Send + 'static {
    /// Waits for the next message.
    ///
    /// `None` means the channel has ended; `Some(Err(_))` is a subscription
    /// failure after which the subscription should be released.
    fn next_message(&mut self) -> impl Future<Output = Option<Result<String, BackendError>>> + Send;

    /// Unsubscribes and releases the handle.
    fn unsubscribe(self) -> impl Future<Output = ()> + Send;
}

/// In-process backend for a single logical node.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current length of the list at `key`.
    pub async fn len(&self, key: &str) -> usize {
        self.lists.lock().await.get(key).map_or(0, VecDeque::len)
    }

    /// Returns the number of live subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .await
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    async fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Backend for MemoryBackend {
    type Subscription = MemorySubscription;

    async fn push_front(&self, key: &str, value: String) -> Result<(), BackendError> {
        let mut lists = self.lists.lock().await;
        lists.entry(key.to_string()).or_default().push_front(value);
        Ok(())
    }

    async fn trim(&self, key: &str, start: usize, stop: usize) -> Result<(), BackendError> {
        let mut lists = self.lists.lock().await;
        if let Some(list) = lists.get_mut(key) {
            list.truncate(stop.saturating_add(1));
            list.drain(..start.min(list.len()));
        }
        Ok(())
    }

    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>, BackendError> {
        let lists = self.lists.lock().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        let take = stop.saturating_add(1).saturating_sub(start);
        Ok(list.iter().skip(start).take(take).cloned().collect())
    }

    async fn publish(&self, channel: &str, message: String) -> Result<usize, BackendError> {
        let sender = self.sender(channel).await;
        // A send with no receivers is not an error for pub/sub.
        let receivers = sender.send(message).unwrap_or(0);
        trace!(channel, receivers, "Published message");
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<MemorySubscription, BackendError> {
        let rx = self.sender(channel).await.subscribe();
        debug!(channel, "Subscribed");
        Ok(MemorySubscription {
            channel: channel.to_string(),
            rx,
        })
    }
}

/// Subscription handle for [`MemoryBackend`] channels.
#[derive(Debug)]
pub struct MemorySubscription {
    channel: String,
    rx: broadcast::Receiver<String>,
}

impl MemorySubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Subscription for MemorySubscription {
    async fn next_message(&mut self) -> Option<Result<String, BackendError>> {
        match self.rx.recv().await {
            Ok(message) => Some(Ok(message)),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                Some(Err(BackendError::SubscriptionLagged {
                    channel: self.channel.clone(),
                    skipped,
                }))
            }
        }
    }

    async fn unsubscribe(self) {
        debug!(channel = %self.channel, "Unsubscribed");
        drop(self.rx);
    }
}
