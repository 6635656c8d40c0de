//! WebSocket endpoint pushing change deltas to subscribers

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};
use vmixlink_store::{ClientMessage, ServerMessage};

use crate::state::AppState;

/// Upgrade to a change subscription
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the upgrade so no update between the two is lost
    let updates = state.service.notifier().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, updates))
}

async fn handle_socket(mut socket: WebSocket, mut updates: broadcast::Receiver<ServerMessage>) {
    info!("New WebSocket client connected");

    if send(&mut socket, &ServerMessage::welcome()).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !handle_text(&mut socket, &text).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            },
            update = updates.recv() => match update {
                Ok(message) => {
                    if send(&mut socket, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged behind, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("WebSocket client disconnected");
}

/// Answer a text frame; returns false when the socket is gone
async fn handle_text(socket: &mut WebSocket, text: &str) -> bool {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => {
            debug!("Received ping from client, sent pong response");
            send(socket, &ServerMessage::Pong).await.is_ok()
        }
        Ok(ClientMessage::Unknown) => true,
        Err(e) => {
            error!("Error parsing WebSocket message: {}", e);
            true
        }
    }
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to serialize message: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(text)).await
}
