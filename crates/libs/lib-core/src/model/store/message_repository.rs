//! # Message Repository
//!
//! Database access layer for messages.
//!
//! [`MessageRepository::create`] is the persistence step of the relay's
//! send path: it returns the canonical record (store-issued id and
//! timestamp), which is what gets broadcast and acknowledged. Nothing in the
//! relay ever broadcasts a message that this function has not returned.

use sqlx::{query_as, query_scalar};

use super::models::MessageRecord;
use super::DbPool;

/// Message repository for database operations.
pub struct MessageRepository;

impl MessageRepository {
    /// Persist a message and return the canonical record.
    pub async fn create(
        pool: &DbPool,
        room_id: i64,
        user_id: i64,
        text: &str,
    ) -> Result<MessageRecord, sqlx::Error> {
        let id = query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (room_id, user_id, text)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(pool)
        .await?;

        query_as::<_, MessageRecord>(
            r#"
            SELECT m.id, m.room_id, m.user_id, m.text, m.created_at, u.username
            FROM messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.id = ?
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Message history for a room in delivery order: `(created_at, id)`
    /// ascending, the id breaking same-second ties in commit order.
    pub async fn list_for_room(
        pool: &DbPool,
        room_id: i64,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, sqlx::Error> {
        query_as::<_, MessageRecord>(
            r#"
            SELECT m.id, m.room_id, m.user_id, m.text, m.created_at, u.username
            FROM messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.room_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            LIMIT ?
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
