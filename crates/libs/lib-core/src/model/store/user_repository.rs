//! # User Repository
//!
//! Database access layer for user records.
//!
//! This module implements the repository pattern for user data access,
//! providing a clean abstraction over SQL queries. The relay's connection
//! authenticator resolves token subjects to live users through
//! [`UserRepository::find_by_id`]; a subject that no longer resolves is an
//! authentication failure, not a stale session.

use sqlx::query_as;

use super::models::User;
use super::DbPool;

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    /// Find a user by their stable id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(User))` - User exists
    /// * `Ok(None)` - No user with that id (e.g. deleted since token issue)
    /// * `Err(sqlx::Error)` - Database error occurred
    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by their username.
    pub async fn find_by_username(
        pool: &DbPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Create a new user in the database.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the username already exists (UNIQUE
    /// constraint violation) or the database is unavailable.
    pub async fn create(
        pool: &DbPool,
        username: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(pool)
        .await
    }

    /// Search users by username substring, excluding the caller.
    ///
    /// Used by clients to find a peer to open a private room with.
    pub async fn search(
        pool: &DbPool,
        query: &str,
        exclude_user_id: i64,
        limit: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username LIKE '%' || ? || '%' AND id != ?
            ORDER BY username
            LIMIT ?
            "#,
        )
        .bind(query)
        .bind(exclude_user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::test_support::memory_pool;

    #[tokio::test]
    async fn create_and_find() {
        let pool = memory_pool().await;

        let user = UserRepository::create(&pool, "alice", "hash")
            .await
            .expect("user creation should succeed");
        assert_eq!(user.username, "alice");

        let by_id = UserRepository::find_by_id(&pool, user.id)
            .await
            .expect("lookup should succeed");
        assert_eq!(by_id.map(|u| u.username), Some("alice".to_string()));

        let missing = UserRepository::find_by_id(&pool, user.id + 999)
            .await
            .expect("lookup should succeed");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let pool = memory_pool().await;

        UserRepository::create(&pool, "alice", "hash")
            .await
            .expect("first creation should succeed");
        let dup = UserRepository::create(&pool, "alice", "hash2").await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn search_excludes_caller() {
        let pool = memory_pool().await;

        let alice = UserRepository::create(&pool, "alice", "h").await.unwrap();
        UserRepository::create(&pool, "alicia", "h").await.unwrap();
        UserRepository::create(&pool, "bob", "h").await.unwrap();

        let found = UserRepository::search(&pool, "ali", alice.id, 10)
            .await
            .expect("search should succeed");
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alicia"]);
    }
}
