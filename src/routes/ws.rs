//! WebSocket handler: the transport adapter in front of the coordinator.
//!
//! DESIGN
//! ======
//! On upgrade, allocates a connection ID and an outbound channel, attaches the
//! channel to the coordinator, and enters a `select!` loop:
//! - Incoming text frames → decode → coordinator dispatch
//! - Outbound events queued for this connection → serialize → socket
//!
//! Every event for this client, replies included, flows through the channel,
//! so the client sees events in exactly the order the coordinator produced them.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → attach outbound channel
//! 2. Client sends events → decode → coordinator (under the state lock)
//! 3. Close or socket error → coordinator disconnect → peers notified

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::frame::{ConnectionId, ErrorCode, Inbound, Outbound};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let capacity = state.config.client_channel_capacity;
    let (tx, mut rx) = mpsc::channel::<Outbound>(capacity);
    state.coordinator.lock().await.connect(connection_id, tx);

    info!(%connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        process_inbound_text(&state, connection_id, text.as_str()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = rx.recv() => {
                if send_outbound(&mut socket, connection_id, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    state.coordinator.lock().await.disconnect(connection_id);
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Decode one inbound text frame and hand it to the coordinator. Malformed
/// frames are logged and dropped; they never close the connection.
async fn process_inbound_text(state: &AppState, connection_id: ConnectionId, text: &str) {
    let event = match Inbound::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%connection_id, code = e.error_code(), error = %e, "ws: dropped inbound frame");
            return;
        }
    };

    let name = event.event_name();
    if matches!(event, Inbound::Drawing(_) | Inbound::CursorMove(_)) {
        trace!(%connection_id, event = name, "ws: recv");
    } else {
        debug!(%connection_id, event = name, "ws: recv");
    }

    let mut coordinator = state.coordinator.lock().await;
    coordinator.dispatch(connection_id, event);
}

// =============================================================================
// OUTBOUND
// =============================================================================

async fn send_outbound(
    socket: &mut WebSocket,
    connection_id: ConnectionId,
    event: &Outbound,
) -> Result<(), axum::Error> {
    let json = match event.encode() {
        Ok(json) => json,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: failed to serialize outbound event");
            return Ok(());
        }
    };
    if !event.is_chatty() {
        debug!(%connection_id, bytes = json.len(), "ws: send");
    }
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
