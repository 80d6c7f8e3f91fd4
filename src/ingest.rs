//! The ingest pipeline: raw webhook payload to stored, published event.
//!
//! ```text
//! payload ── normalize ──► Event ──(push)──► detect_conflicts(recent 20)
//!                                                   │
//!                               ┌───────────────────┴──────────────┐
//!                               ▼                                  ▼
//!                         store.append                       store.publish
//! ```
//!
//! Append and publish are independent side effects: both are always
//! attempted, each outcome is logged, and a failure in one never hides the
//! other. The broadcast hub picks the event up from the fan-out channel.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::conflict::detect_conflicts;
use crate::store::{Backend, EventStore, StoreError};
use crate::types::{ConflictAlert, Event};
use crate::webhooks::normalize;

/// How many recent events a new push is checked against.
pub const DETECTION_WINDOW: usize = 20;

/// One or both side effects of ingesting an event failed.
///
/// Every variant carries the normalized event, which was built successfully.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to store event {}: {source}", .event.id)]
    Append {
        event: Box<Event>,
        #[source]
        source: StoreError,
    },

    #[error("failed to publish event {}: {source}", .event.id)]
    Publish {
        event: Box<Event>,
        #[source]
        source: StoreError,
    },

    #[error("failed to store ({append}) and publish ({publish}) event {}", .event.id)]
    Both {
        event: Box<Event>,
        append: StoreError,
        publish: StoreError,
    },
}

impl IngestError {
    pub fn event(&self) -> &Event {
        match self {
            IngestError::Append { event, .. }
            | IngestError::Publish { event, .. }
            | IngestError::Both { event, .. } => event,
        }
    }

    /// True if neither side effect succeeded.
    pub fn is_total(&self) -> bool {
        matches!(self, IngestError::Both { .. })
    }
}

/// Runs webhook payloads through normalization, detection and the store.
///
/// Safe to call concurrently; each call is independent.
pub struct Ingest<B> {
    store: Arc<EventStore<B>>,
}

impl<B> Clone for Ingest<B> {
    fn clone(&self) -> Self {
        Ingest {
            store: Arc::clone(&self.store),
        }
    }
}

impl<B: Backend> Ingest<B> {
    pub fn new(store: Arc<EventStore<B>>) -> Self {
        Ingest { store }
    }

    pub fn store(&self) -> &Arc<EventStore<B>> {
        &self.store
    }

    /// Ingests one webhook delivery of kind `event_kind`.
    pub async fn handle(&self, event_kind: &str, payload: &Value) -> Result<Event, IngestError> {
        let mut event = normalize(event_kind, payload);
        debug!(event_id = %event.id, event_type = %event.event_type, "Normalized event");

        if event.event_type.is_push() && !event.files_changed.is_empty() {
            event.alert = self.check_conflicts(&event).await;
        }

        let appended = self.store.append(&event).await;
        match &appended {
            Ok(()) => debug!(event_id = %event.id, "Stored event"),
            Err(e) => error!(event_id = %event.id, error = %e, "Failed to store event"),
        }

        let published = self.store.publish(&event).await;
        match &published {
            Ok(receivers) => debug!(event_id = %event.id, receivers, "Published event"),
            Err(e) => error!(event_id = %event.id, error = %e, "Failed to publish event"),
        }

        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            title = %event.title,
            "Processed event"
        );

        let event = Box::new(event);
        match (appended, published) {
            (Ok(()), Ok(_)) => Ok(*event),
            (Err(source), Ok(_)) => Err(IngestError::Append { event, source }),
            (Ok(()), Err(source)) => Err(IngestError::Publish { event, source }),
            (Err(append), Err(publish)) => Err(IngestError::Both {
                event,
                append,
                publish,
            }),
        }
    }

    async fn check_conflicts(&self, event: &Event) -> Option<ConflictAlert> {
        let recent = match self.store.recent(DETECTION_WINDOW).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Skipping conflict detection, recent events unavailable");
                return None;
            }
        };

        let alert = detect_conflicts(event, &recent)?;
        warn!(
            event_id = %event.id,
            severity = ?alert.severity,
            branches = ?alert.branches,
            files = alert.conflicting_files.len(),
            "Conflict risk detected"
        );
        Some(alert)
    }
}
