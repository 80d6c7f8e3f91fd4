//! Redis-backed [`Backend`].
//!
//! Lists map onto `LPUSH`/`LTRIM`/`LRANGE` and channels onto `PUBLISH` and a
//! dedicated pub/sub connection per subscription. Commands share one
//! multiplexed connection, so the backend is cheap to call from many tasks.

use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::{MultiplexedConnection, PubSub};
use tracing::{debug, trace, warn};

use super::backend::{Backend, BackendError, Subscription};

impl From<redis::RedisError> for BackendError {
    fn from(e: redis::RedisError) -> Self {
        BackendError::Unavailable(e.to_string())
    }
}

/// Redis list indices are signed; anything past `isize::MAX` is "to the end".
fn index(i: usize) -> isize {
    isize::try_from(i).unwrap_or(isize::MAX)
}

/// Builds a `redis://` URL from a host and port.
pub fn redis_url(host: &str, port: u16) -> String {
    format!("redis://{host}:{port}/")
}

/// A Redis server reached through one multiplexed command connection.
#[derive(Clone)]
pub struct RedisBackend {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("addr", &self.client.get_connection_info().addr)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connects to the server at `url` (`redis://host:port/`).
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!(addr = %client.get_connection_info().addr, "Connected to Redis");
        Ok(RedisBackend { client, conn })
    }
}

impl Backend for RedisBackend {
    type Subscription = RedisSubscription;

    async fn push_front(&self, key: &str, value: String) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn trim(&self, key: &str, start: usize, stop: usize) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        conn.ltrim::<_, ()>(key, index(start), index(stop)).await?;
        Ok(())
    }

    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>, BackendError> {
        let mut conn = self.conn.clone();
        let values = conn
            .lrange::<_, Vec<String>>(key, index(start), index(stop))
            .await?;
        Ok(values)
    }

    async fn publish(&self, channel: &str, message: String) -> Result<usize, BackendError> {
        let mut conn = self.conn.clone();
        let receivers = conn.publish::<_, _, usize>(channel, message).await?;
        trace!(channel, receivers, "Published message");
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<RedisSubscription, BackendError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        debug!(channel, "Subscribed");
        Ok(RedisSubscription {
            channel: channel.to_string(),
            pubsub,
        })
    }
}

/// A `SUBSCRIBE`d pub/sub connection.
pub struct RedisSubscription {
    channel: String,
    pubsub: PubSub,
}

impl RedisSubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Subscription for RedisSubscription {
    async fn next_message(&mut self) -> Option<Result<String, BackendError>> {
        let message = self.pubsub.on_message().next().await?;
        Some(message.get_payload::<String>().map_err(BackendError::from))
    }

    async fn unsubscribe(mut self) {
        match self.pubsub.unsubscribe(&self.channel).await {
            Ok(()) => debug!(channel = %self.channel, "Unsubscribed"),
            // The connection is dropped either way, which ends the subscription.
            Err(e) => warn!(channel = %self.channel, error = %e, "UNSUBSCRIBE failed"),
        }
    }
}
