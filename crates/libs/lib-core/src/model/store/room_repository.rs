//! # Room Repository
//!
//! Database access layer for rooms and memberships.
//!
//! This repository is the room membership authority's backing store:
//! [`RoomRepository::is_participant`] and
//! [`RoomRepository::participants_of`] answer membership questions as
//! point-in-time snapshots, and every membership-changing write enforces the
//! one-membership-per-user-per-room invariant through the store's UNIQUE
//! constraint rather than in-memory bookkeeping.

use sqlx::{query, query_as, query_scalar};

use super::models::{Room, RoomMember};
use super::DbPool;

/// Room repository for database operations.
pub struct RoomRepository;

impl RoomRepository {
    /// Create a room and auto-join the creator.
    ///
    /// `invite_code` must be `Some` exactly when `is_group` is true; the
    /// caller generates it. Room and creator membership are committed in one
    /// transaction so a room can never exist without its creator.
    pub async fn create(
        pool: &DbPool,
        name: &str,
        is_group: bool,
        invite_code: Option<&str>,
        creator_id: i64,
    ) -> Result<Room, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let room = query_as::<_, Room>(
            r#"
            INSERT INTO rooms (name, is_group, invite_code)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(is_group)
        .bind(invite_code)
        .fetch_one(&mut *tx)
        .await?;

        query("INSERT INTO room_participants (user_id, room_id) VALUES (?, ?)")
            .bind(creator_id)
            .bind(room.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(room)
    }

    /// Find a room by id.
    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Room>, sqlx::Error> {
        query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a room by its invite code.
    pub async fn find_by_invite_code(
        pool: &DbPool,
        invite_code: &str,
    ) -> Result<Option<Room>, sqlx::Error> {
        query_as::<_, Room>("SELECT * FROM rooms WHERE invite_code = ?")
            .bind(invite_code)
            .fetch_optional(pool)
            .await
    }

    /// Is the user currently a member of the room?
    ///
    /// Callers re-check this on every send/join/typing rather than caching:
    /// membership can change out-of-band while a session is open.
    pub async fn is_participant(
        pool: &DbPool,
        user_id: i64,
        room_id: i64,
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM room_participants WHERE user_id = ? AND room_id = ?)",
        )
        .bind(user_id)
        .bind(room_id)
        .fetch_one(pool)
        .await
    }

    /// All members of a room, with usernames.
    pub async fn participants_of(
        pool: &DbPool,
        room_id: i64,
    ) -> Result<Vec<RoomMember>, sqlx::Error> {
        query_as::<_, RoomMember>(
            r#"
            SELECT p.user_id, u.username
            FROM room_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.room_id = ?
            ORDER BY u.username
            "#,
        )
        .bind(room_id)
        .fetch_all(pool)
        .await
    }

    /// Add a user to a room. Idempotent: adding an existing member is a
    /// no-op and reports `false`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - membership was created
    /// * `Ok(false)` - the user was already a member
    pub async fn add_participant(
        pool: &DbPool,
        user_id: i64,
        room_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = query(
            r#"
            INSERT INTO room_participants (user_id, room_id)
            VALUES (?, ?)
            ON CONFLICT(user_id, room_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(room_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rooms the user belongs to, most recently created first.
    pub async fn rooms_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Room>, sqlx::Error> {
        query_as::<_, Room>(
            r#"
            SELECT r.*
            FROM rooms r
            JOIN room_participants p ON p.room_id = r.id
            WHERE p.user_id = ?
            ORDER BY r.updated_at DESC, r.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Find the private (non-group) room whose membership is exactly the
    /// unordered pair `{user_a, user_b}`, if one exists.
    pub async fn find_private_between(
        pool: &DbPool,
        user_a: i64,
        user_b: i64,
    ) -> Result<Option<Room>, sqlx::Error> {
        query_as::<_, Room>(
            r#"
            SELECT r.*
            FROM rooms r
            WHERE r.is_group = 0
              AND EXISTS(SELECT 1 FROM room_participants p WHERE p.room_id = r.id AND p.user_id = ?)
              AND EXISTS(SELECT 1 FROM room_participants p WHERE p.room_id = r.id AND p.user_id = ?)
              AND (SELECT COUNT(*) FROM room_participants p WHERE p.room_id = r.id) = 2
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(pool)
        .await
    }

    /// Create a private room between two users, both joined atomically.
    pub async fn create_private(
        pool: &DbPool,
        user_a: i64,
        user_b: i64,
    ) -> Result<Room, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let room = query_as::<_, Room>(
            r#"
            INSERT INTO rooms (name, is_group, invite_code)
            VALUES ('', 0, NULL)
            RETURNING *
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        query("INSERT INTO room_participants (user_id, room_id) VALUES (?, ?), (?, ?)")
            .bind(user_a)
            .bind(room.id)
            .bind(user_b)
            .bind(room.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(room)
    }
}
