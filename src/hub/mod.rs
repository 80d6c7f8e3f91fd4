//! Broadcast hub: the set of live clients and fan-out to them.
//!
//! A client is registered with [`Hub::attach`] only after its seed (the most
//! recent events) has been delivered. [`Hub::broadcast`] sends to every
//! registered client and drops the ones whose send fails, so a dead client is
//! gone after the first broadcast that touches it.
//!
//! The [`listener`] module bridges the store's fan-out channel to the hub.

pub mod connection;
pub mod listener;
pub mod ws;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::store::BackendError;
use crate::types::{ConnectionId, Event};

pub use connection::{Connection, ConnectionError};
pub use listener::{ListenerHandle, run_listener, spawn_listener};
pub use ws::WsConnection;

/// Number of recent events a new client is seeded with.
pub const SEED_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum HubError {
    /// Seeding a new client failed; it was never registered.
    #[error("seeding failed after {delivered} events: {source}")]
    SeedFailed {
        delivered: usize,
        #[source]
        source: ConnectionError,
    },

    /// The fan-out subscription reported an error.
    #[error("subscription failed: {0}")]
    Subscription(#[from] BackendError),

    /// The fan-out channel ended without being cancelled.
    #[error("subscription channel closed")]
    SubscriptionClosed,

    /// The listener task panicked or was aborted.
    #[error("listener task failed: {0}")]
    ListenerTask(String),
}

/// Outcome of one [`Hub::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: usize,
}

/// The set of live clients.
pub struct Hub<C> {
    connections: Mutex<HashMap<ConnectionId, C>>,
    next_id: AtomicU64,
}

impl<C: Connection> Hub<C> {
    pub fn new() -> Self {
        Hub {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seeds `connection` with `seed` and registers it.
    ///
    /// At most [`SEED_LIMIT`] events are sent, in the order given (newest
    /// first). If any seed send fails the connection is dropped unregistered.
    pub async fn attach(&self, connection: C, seed: &[Event]) -> Result<ConnectionId, HubError> {
        for (delivered, event) in seed.iter().take(SEED_LIMIT).enumerate() {
            if let Err(source) = connection.send_event(event).await {
                warn!(delivered, error = %source, "Seeding new client failed");
                return Err(HubError::SeedFailed { delivered, source });
            }
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut connections = self.connections.lock().await;
        connections.insert(id, connection);
        info!(connection_id = %id, total = connections.len(), "Client connected");
        Ok(id)
    }

    /// Unregisters `id`. Unknown ids are ignored.
    ///
    /// Returns whether a connection was removed.
    pub async fn detach(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            info!(connection_id = %id, total = connections.len(), "Client disconnected");
        }
        removed
    }

    /// Sends `message` to every registered client, removing those that fail.
    ///
    /// The registry stays locked for the whole fan-out, so clients attached or
    /// detached concurrently are handled before or after it, never during.
    pub async fn broadcast(&self, message: &str) -> BroadcastReport {
        let mut connections = self.connections.lock().await;
        let mut failed = Vec::new();
        let mut report = BroadcastReport::default();

        for (id, connection) in connections.iter() {
            match connection.send_text(message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!(connection_id = %id, error = %e, "Dropping client after failed send");
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            connections.remove(&id);
            report.removed += 1;
        }

        debug!(
            delivered = report.delivered,
            removed = report.removed,
            "Broadcast complete"
        );
        report
    }

    /// Unregisters every client, returning how many there were.
    ///
    /// Dropping a [`WsConnection`] ends its socket task, so this closes all
    /// live WebSockets.
    pub async fn close_all(&self) -> usize {
        let mut connections = self.connections.lock().await;
        let closed = connections.len();
        connections.clear();
        info!(closed, "Closed all clients");
        closed
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl<C: Connection> Default for Hub<C> {
    fn default() -> Self {
        Self::new()
    }
}
