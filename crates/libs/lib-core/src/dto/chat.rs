//! # Chat DTOs
//!
//! Room and message shapes shared by the REST surface and the socket
//! protocol. `Message` here is the *canonical* message: it exists only after
//! the store has persisted the text and assigned an id and timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public identity of a user: the stable id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

/// A persisted chat message, as delivered to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub chat_room_id: i64,
    pub text: String,
    pub user: UserInfo,
    pub created_at: DateTime<Utc>,
}

/// A room with its membership, as returned by the rooms endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: i64,
    pub name: String,
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    pub participants: Vec<UserInfo>,
}

/// A room with its membership and message history, as returned by
/// `GET /api/rooms/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    #[serde(flatten)]
    pub room: RoomInfo,
    pub messages: Vec<Message>,
}

/// Body of `POST /api/rooms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
}

/// Body of `POST /api/rooms/{id}/add-user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    pub user_id: i64,
}

/// Body of `POST /api/rooms/join-by-invite-code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinByInviteRequest {
    pub invite_code: String,
}
