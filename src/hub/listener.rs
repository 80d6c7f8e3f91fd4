//! Bridges the store's fan-out channel to the hub.
//!
//! Each message received on the subscription is broadcast verbatim, in arrival
//! order. Cancellation is checked between messages; a broadcast that is
//! already running finishes first. The subscription is released on every
//! exit path.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Connection, Hub, HubError};
use crate::store::Subscription;

/// Forwards messages from `subscription` to `hub` until cancelled.
///
/// Returns `Ok` on cancellation. An upstream error or the channel ending
/// stops the listener with an error; either way the subscription is released
/// before returning.
pub async fn run_listener<C, S>(
    hub: Arc<Hub<C>>,
    mut subscription: S,
    cancel: CancellationToken,
) -> Result<(), HubError>
where
    C: Connection,
    S: Subscription,
{
    info!("Fan-out listener started");

    let outcome = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("Fan-out listener cancelled");
                break Ok(());
            }

            message = subscription.next_message() => match message {
                Some(Ok(message)) => {
                    let report = hub.broadcast(&message).await;
                    debug!(delivered = report.delivered, removed = report.removed, "Forwarded event");
                }
                Some(Err(e)) => {
                    error!(error = %e, "Fan-out subscription failed");
                    break Err(HubError::Subscription(e));
                }
                None => {
                    warn!("Fan-out channel closed");
                    break Err(HubError::SubscriptionClosed);
                }
            },
        }
    };

    subscription.unsubscribe().await;
    outcome
}

/// A running listener task.
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), HubError>>,
}

impl ListenerHandle {
    /// Cancels the listener and waits until it has unsubscribed.
    pub async fn shutdown(self) -> Result<(), HubError> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| HubError::ListenerTask(e.to_string()))?
    }
}

/// Spawns [`run_listener`] on the current runtime.
///
/// The listener stops when `cancel` (or a parent token) is cancelled, or when
/// [`ListenerHandle::shutdown`] is called.
pub fn spawn_listener<C, S>(
    hub: Arc<Hub<C>>,
    subscription: S,
    cancel: CancellationToken,
) -> ListenerHandle
where
    C: Connection,
    S: Subscription,
{
    let task = tokio::spawn(run_listener(hub, subscription, cancel.clone()));
    ListenerHandle { cancel, task }
}
