//! WebSocket Protocol Messages
//!
//! This module defines the client/server message types for the document
//! relay WebSocket API. Draw events carry the stroke path and style so
//! peers can rasterize them locally; snapshot payloads travel as PNG data
//! URLs and are opaque to the relay.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stroke path point in logical canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    /// Logical x coordinate
    pub x: f32,
    /// Logical y coordinate
    pub y: f32,
}

/// How a relayed stroke combines with the destination buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendOp {
    /// Paint over existing pixels
    #[default]
    SourceOver,
    /// Erase existing pixels
    DestinationOut,
}

/// Stamp shape used when a relayed stroke is re-rasterized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeCap {
    /// Disc stamps (brush, eraser)
    #[default]
    Round,
    /// Square stamps (pencil)
    Square,
}

/// Messages sent from client to relay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a document room
    JoinDocument {
        /// Document to join
        document_id: String,
    },

    /// Leave a document room
    LeaveDocument {
        /// Document to leave
        document_id: String,
    },

    /// A stroke segment drawn by this user
    DrawEvent {
        /// Document the stroke belongs to
        document_id: String,
        /// Stroke path in logical coordinates
        path: Vec<WirePoint>,
        /// Stroke color as a hex string
        stroke_style: String,
        /// Stroke width in logical pixels
        line_width: f32,
        /// Originating user
        user_id: Uuid,
        /// Blend operation (absent on older clients means paint)
        #[serde(default)]
        mode: BlendOp,
        /// Stamp shape (absent on older clients means round)
        #[serde(default)]
        cap: StrokeCap,
    },

    /// Full canvas snapshot pushed to peers
    CanvasUpdate {
        /// Document the snapshot belongs to
        document_id: String,
        /// Composite image as a PNG data URL
        data_url: String,
    },

    /// Ask room peers for the current canvas state
    RequestCanvasState {
        /// Document to catch up on
        document_id: String,
    },

    /// Reply to a state request with the current canvas
    SendCanvasState {
        /// Document the snapshot belongs to
        document_id: String,
        /// Composite image as a PNG data URL
        data_url: String,
        /// Requester to deliver to (None = whole room)
        target_user_id: Option<Uuid>,
    },
}

/// Messages sent from relay to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A peer joined the room
    UserJoined {
        /// The peer that joined
        user_id: Uuid,
    },

    /// A peer left the room or disconnected
    UserLeft {
        /// The peer that left
        user_id: Uuid,
    },

    /// A peer drew a stroke segment
    DrawEvent {
        /// Document the stroke belongs to
        document_id: String,
        /// Stroke path in logical coordinates
        path: Vec<WirePoint>,
        /// Stroke color as a hex string
        stroke_style: String,
        /// Stroke width in logical pixels
        line_width: f32,
        /// Originating user
        user_id: Uuid,
        /// Blend operation
        #[serde(default)]
        mode: BlendOp,
        /// Stamp shape
        #[serde(default)]
        cap: StrokeCap,
    },

    /// A peer pushed a canvas snapshot
    CanvasUpdate {
        /// Composite image as a PNG data URL
        data_url: String,
    },

    /// A peer asked for the current canvas state
    RequestCanvasState {
        /// The peer that asked
        requester_id: Uuid,
        /// Document being caught up on
        document_id: String,
    },
}

impl ServerMessage {
    /// Create a user joined message
    #[must_use]
    pub fn user_joined(user_id: Uuid) -> Self {
        Self::UserJoined { user_id }
    }

    /// Create a user left message
    #[must_use]
    pub fn user_left(user_id: Uuid) -> Self {
        Self::UserLeft { user_id }
    }

    /// Create a canvas update message
    #[must_use]
    pub fn canvas_update(data_url: impl Into<String>) -> Self {
        Self::CanvasUpdate {
            data_url: data_url.into(),
        }
    }

    /// Create a state request message
    #[must_use]
    pub fn request_canvas_state(requester_id: Uuid, document_id: impl Into<String>) -> Self {
        Self::RequestCanvasState {
            requester_id,
            document_id: document_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialization() {
        let msg = ClientMessage::JoinDocument {
            document_id: "doc-1".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"join_document\""));

        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ClientMessage::JoinDocument { document_id } => {
                assert_eq!(document_id, "doc-1");
            }
            other => unreachable!("Expected JoinDocument message, got {:?}", other),
        }
    }

    #[test]
    fn test_draw_event_defaults_to_paint() {
        // A draw event from a client that predates erase support carries
        // no mode field and must deserialize as paint.
        let json = format!(
            r##"{{
                "type": "draw_event",
                "document_id": "doc-1",
                "path": [{{"x": 1.0, "y": 2.0}}],
                "stroke_style": "#000000",
                "line_width": 2.0,
                "user_id": "{}"
            }}"##,
            Uuid::nil()
        );
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ClientMessage::DrawEvent { mode, cap, path, .. } => {
                assert_eq!(mode, BlendOp::SourceOver);
                assert_eq!(cap, StrokeCap::Round);
                assert_eq!(path.len(), 1);
            }
            other => unreachable!("Expected DrawEvent message, got {:?}", other),
        }
    }

    #[test]
    fn test_stroke_cap_serialization() {
        let json = serde_json::to_string(&StrokeCap::Square).unwrap();
        assert_eq!(json, "\"square\"");
    }

    #[test]
    fn test_blend_op_serialization() {
        let json = serde_json::to_string(&BlendOp::DestinationOut).unwrap();
        assert_eq!(json, "\"destination_out\"");
    }

    #[test]
    fn test_send_canvas_state_targeting() {
        let target = Uuid::new_v4();
        let msg = ClientMessage::SendCanvasState {
            document_id: "doc-1".to_string(),
            data_url: "data:image/png;base64,AAAA".to_string(),
            target_user_id: Some(target),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"send_canvas_state\""));
        assert!(json.contains(&target.to_string()));
    }

    #[test]
    fn test_server_message_helpers() {
        let requester = Uuid::new_v4();
        let msg = ServerMessage::request_canvas_state(requester, "doc-1");
        match msg {
            ServerMessage::RequestCanvasState {
                requester_id,
                document_id,
            } => {
                assert_eq!(requester_id, requester);
                assert_eq!(document_id, "doc-1");
            }
            other => unreachable!("Expected RequestCanvasState message, got {:?}", other),
        }
    }
}
