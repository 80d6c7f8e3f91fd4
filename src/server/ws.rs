//! Live event stream over WebSocket.
//!
//! On upgrade the client is seeded with the most recent events and registered
//! with the hub; from then on it receives every published event until it
//! disconnects or falls behind.

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{debug, warn};

use super::AppState;
use crate::hub::{SEED_LIMIT, WsConnection, ws::pump};
use crate::store::Backend;

/// `GET /ws`
pub async fn ws_handler<B: Backend>(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState<B>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket<B: Backend>(socket: WebSocket, app_state: AppState<B>) {
    let seed = match app_state.store().recent(SEED_LIMIT).await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "Could not load seed events, connecting without history");
            Vec::new()
        }
    };

    let (connection, outbound) = WsConnection::channel();
    let id = match app_state.hub().attach(connection, &seed).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Rejecting WebSocket client");
            return;
        }
    };

    let exit = pump(socket, outbound).await;
    debug!(connection_id = %id, ?exit, "WebSocket closed");
    app_state.hub().detach(id).await;
}
