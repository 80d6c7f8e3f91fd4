//! WebSocket-backed [`Connection`].
//!
//! The hub never touches the socket directly. Each client gets a bounded
//! channel; a per-socket task (see [`pump`]) drains it onto the wire and
//! watches the socket for closure. A full or closed channel counts as a failed
//! send, which gets the client dropped from the hub.

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

use super::{Connection, ConnectionError};

/// Outbound messages buffered per client before it counts as stalled.
pub const OUTBOUND_BUFFER: usize = 256;

/// Hub-side handle for one WebSocket client.
#[derive(Debug, Clone)]
pub struct WsConnection {
    tx: mpsc::Sender<String>,
}

impl WsConnection {
    /// Creates a connection and the receiver its socket task drains.
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        Self::with_capacity(OUTBOUND_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (WsConnection { tx }, rx)
    }
}

impl Connection for WsConnection {
    async fn send_text(&self, text: &str) -> Result<(), ConnectionError> {
        self.tx.try_send(text.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => ConnectionError::Backpressure,
            TrySendError::Closed(_) => ConnectionError::Closed,
        })
    }
}

/// Why a socket pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The client closed the socket or the read side failed.
    ClientClosed,
    /// Writing to the socket failed.
    WriteFailed,
    /// The hub dropped this client.
    Dropped,
}

/// Drives one socket: forwards queued messages and discards client input.
///
/// Returns once the client goes away or the hub drops the sending side.
pub async fn pump(mut socket: WebSocket, mut outbound: mpsc::Receiver<String>) -> PumpExit {
    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = socket.send(Message::Text(text.into())).await {
                        debug!(error = %e, "WebSocket write failed");
                        return PumpExit::WriteFailed;
                    }
                }
                None => {
                    let _ = socket.send(Message::Close(None)).await;
                    return PumpExit::Dropped;
                }
            },

            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => return PumpExit::ClientClosed,
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket read failed");
                    return PumpExit::ClientClosed;
                }
                // Client messages are keep-alives only.
                Some(Ok(_)) => trace!("Ignoring client message"),
            },
        }
    }
}
