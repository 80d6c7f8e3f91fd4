//! The live-client boundary.

use std::future::Future;

use thiserror::Error;

use crate::types::Event;

/// Delivery to one live client failed.
///
/// Any of these ends the connection; the hub never retries a client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The client side has gone away.
    #[error("connection closed")]
    Closed,

    /// The client is not draining its outbound buffer.
    #[error("outbound buffer full")]
    Backpressure,

    /// The event could not be encoded for the wire.
    #[error("failed to encode event: {0}")]
    Encode(String),

    /// Transport-specific failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// One live client as seen by the hub.
///
/// The hub only looks at whether each send succeeded, never at transport
/// details.
pub trait Connection: Send + Sync + 'static {
    /// Sends an already-serialized message.
    fn send_text(&self, text: &str) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Sends a structured event, serialized to its JSON wire form.
    fn send_event(&self, event: &Event) -> impl Future<Output = Result<(), ConnectionError>> + Send {
        async move {
            let text = event
                .to_json()
                .map_err(|e| ConnectionError::Encode(e.to_string()))?;
            self.send_text(&text).await
        }
    }
}
