//! Shared fixtures for lib-web tests.

use lib_core::dto::UserInfo;
use lib_core::model::store::UserRepository;
use lib_core::{Config, DbPool};
use sqlx::sqlite::SqlitePoolOptions;

/// In-memory pool with the chat schema applied.
pub async fn memory_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    sqlx::raw_sql(include_str!("../../../../migrations/0001_create_chat_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to apply schema");

    pool
}

/// Create test config
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret-key-must-be-at-least-32-characters-long!".to_string(),
        jwt_expiration_hours: 24,
        max_message_len: 2000,
        echo_to_sender: true,
    }
}

/// Insert a user and return its identity.
pub async fn seed_user(pool: &DbPool, username: &str) -> UserInfo {
    UserRepository::create(pool, username, "test-hash")
        .await
        .expect("user creation should succeed in test")
        .info()
}
