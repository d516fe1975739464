//! WebSocket Relay Handler
//!
//! This module provides the WebSocket handler that routes draw events and
//! snapshot payloads between the peers of a document room. Fan-out uses a
//! single broadcast channel; each connection's forward task filters by
//! room membership, drops self-originated messages and honors targeted
//! deliveries.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::RoomRegistry;

/// Shared state for the relay handler
pub struct RelayState {
    /// Document room membership
    pub rooms: RoomRegistry,
    /// Broadcast channel for room fan-out
    pub broadcast_tx: broadcast::Sender<RelayBroadcast>,
}

impl RelayState {
    /// Create a new relay state
    #[must_use]
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            rooms: RoomRegistry::new(),
            broadcast_tx,
        }
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// Message broadcast to the connections of a document room
#[derive(Debug, Clone)]
pub struct RelayBroadcast {
    /// Room the message belongs to
    pub document_id: String,
    /// Connection that originated the message (excluded from delivery)
    pub origin: Uuid,
    /// Single recipient (None = every room member except the origin)
    pub target: Option<Uuid>,
    /// Server message to deliver
    pub message: ServerMessage,
}

/// WebSocket upgrade handler
pub async fn relay_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a relay connection
async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let user_id = Uuid::new_v4();
    info!(user_id = %user_id, "relay connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(tokio::sync::Mutex::new(sender));

    let mut broadcast_rx = state.broadcast_tx.subscribe();

    // Forward task: deliver room traffic addressed to this connection.
    let forward_sender = sender.clone();
    let forward_rooms = state.rooms.clone();
    let forward_handle = tokio::spawn(async move {
        while let Ok(broadcast) = broadcast_rx.recv().await {
            if broadcast.origin == user_id {
                continue;
            }
            if let Some(target) = broadcast.target {
                if target != user_id {
                    continue;
                }
            }
            if !forward_rooms.is_member(&broadcast.document_id, user_id).await {
                continue;
            }
            let Ok(json) = serde_json::to_string(&broadcast.message) else {
                continue;
            };
            let mut guard = forward_sender.lock().await;
            if guard.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Main message loop
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handle_client_message(&text, user_id, &state).await {
                    warn!(user_id = %user_id, error = %e, "error handling relay message");
                }
            }
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "relay closed by client");
                break;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "relay socket error");
                break;
            }
            _ => {}
        }
    }

    forward_handle.abort();

    // Announce departure to every room this connection was still in.
    for document_id in state.rooms.disconnect(user_id).await {
        let _ = state.broadcast_tx.send(RelayBroadcast {
            document_id,
            origin: user_id,
            target: None,
            message: ServerMessage::user_left(user_id),
        });
    }
    info!(user_id = %user_id, "relay disconnected");
}

/// Handle a single client message
async fn handle_client_message(
    text: &str,
    user_id: Uuid,
    state: &Arc<RelayState>,
) -> Result<(), String> {
    let client_msg: ClientMessage =
        serde_json::from_str(text).map_err(|e| format!("invalid message: {e}"))?;

    match client_msg {
        ClientMessage::JoinDocument { document_id } => {
            if state.rooms.join(&document_id, user_id).await {
                let _ = state.broadcast_tx.send(RelayBroadcast {
                    document_id,
                    origin: user_id,
                    target: None,
                    message: ServerMessage::user_joined(user_id),
                });
            }
        }

        ClientMessage::LeaveDocument { document_id } => {
            if state.rooms.leave(&document_id, user_id).await {
                let _ = state.broadcast_tx.send(RelayBroadcast {
                    document_id,
                    origin: user_id,
                    target: None,
                    message: ServerMessage::user_left(user_id),
                });
            }
        }

        ClientMessage::DrawEvent {
            document_id,
            path,
            stroke_style,
            line_width,
            user_id: drawing_user,
            mode,
            cap,
        } => {
            debug!(document_id, points = path.len(), "relaying draw event");
            let _ = state.broadcast_tx.send(RelayBroadcast {
                document_id: document_id.clone(),
                origin: user_id,
                target: None,
                message: ServerMessage::DrawEvent {
                    document_id,
                    path,
                    stroke_style,
                    line_width,
                    user_id: drawing_user,
                    mode,
                    cap,
                },
            });
        }

        ClientMessage::CanvasUpdate {
            document_id,
            data_url,
        } => {
            let _ = state.broadcast_tx.send(RelayBroadcast {
                document_id,
                origin: user_id,
                target: None,
                message: ServerMessage::canvas_update(data_url),
            });
        }

        ClientMessage::RequestCanvasState { document_id } => {
            let _ = state.broadcast_tx.send(RelayBroadcast {
                document_id: document_id.clone(),
                origin: user_id,
                target: None,
                message: ServerMessage::request_canvas_state(user_id, document_id),
            });
        }

        ClientMessage::SendCanvasState {
            document_id,
            data_url,
            target_user_id,
        } => {
            let _ = state.broadcast_tx.send(RelayBroadcast {
                document_id,
                origin: user_id,
                target: target_user_id,
                message: ServerMessage::canvas_update(data_url),
            });
        }
    }

    Ok(())
}
