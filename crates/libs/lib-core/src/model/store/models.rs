//! # Store Entities
//!
//! Row-level entity types returned by the repositories.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::dto::{self, UserInfo};

/// User entity representing a complete user record from the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The wire-facing identity of this user.
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Room entity.
///
/// `invite_code` is set only for group rooms and is unique across all rooms.
#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub is_group: bool,
    pub invite_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A room membership row, joined with the member's username.
#[derive(Debug, Clone, FromRow)]
pub struct RoomMember {
    pub user_id: i64,
    pub username: String,
}

impl RoomMember {
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.user_id,
            username: self.username.clone(),
        }
    }
}

/// Message entity as stored, joined with the author's username.
///
/// Immutable once persisted; `(created_at, id)` is the delivery order within
/// a room, with the AUTOINCREMENT id breaking same-second ties in commit
/// order.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRecord {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for dto::Message {
    fn from(record: MessageRecord) -> Self {
        dto::Message {
            id: record.id,
            chat_room_id: record.room_id,
            text: record.text,
            user: UserInfo {
                id: record.user_id,
                username: record.username,
            },
            created_at: record.created_at,
        }
    }
}
