//! # Protocol Events
//!
//! The closed set of socket events, both directions. Frames are JSON of the
//! shape `{"event": <name>, "data": {...}}`; dispatch matches on the enum
//! tag, so adding an event without handling it is a compile error rather
//! than a silently ignored string.

use lib_core::dto::Message;
use lib_core::AppError;
use serde::{Deserialize, Serialize};

/// Events a client may issue after authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { chat_room_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { chat_room_id: i64 },
    #[serde(rename_all = "camelCase")]
    SendMessage { chat_room_id: i64, text: String },
    #[serde(rename_all = "camelCase")]
    Typing { chat_room_id: i64, is_typing: bool },
}

/// Events the relay pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Joined { chat_room_id: i64 },
    #[serde(rename_all = "camelCase")]
    Left { chat_room_id: i64 },
    /// A canonical (persisted) message, broadcast to the room.
    NewMessage { message: Message },
    #[serde(rename_all = "camelCase")]
    UserTyping {
        chat_room_id: i64,
        user_id: i64,
        username: String,
        is_typing: bool,
    },
    /// Out-of-band: the user gained membership in a room, delivered to every
    /// live connection of that user regardless of room subscription.
    #[serde(rename_all = "camelCase")]
    AddedToRoom { room_id: i64 },
    /// Acknowledgment of a `sendMessage`, returned to the sender only.
    Ack(SendAck),
    /// Operation failure, reported to the originating connection only.
    Error { reason: String },
}

impl ServerEvent {
    /// Error event carrying the stable error code as its reason.
    pub fn error(err: &AppError) -> Self {
        ServerEvent::Error {
            reason: err.code().to_string(),
        }
    }
}

/// Result of a `sendMessage`, carrying the canonical message on success so
/// clients can reconcile an optimistic local entry against the store-issued
/// id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendAck {
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SendAck {
    pub fn ok(message: Message) -> Self {
        Self {
            status: AckStatus::Ok,
            message: Some(message),
            reason: None,
        }
    }

    pub fn error(err: &AppError) -> Self {
        Self {
            status: AckStatus::Error,
            message: None,
            reason: Some(err.code().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}
