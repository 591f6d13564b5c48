//! # Database Store
//!
//! Database connection pool and repository implementations. This is the
//! narrow create/query contract the relay core depends on; everything else
//! treats the store as an external collaborator that may fail transiently.

// region: --- Modules
pub mod message_repository;
pub mod models;
pub mod room_repository;
pub mod user_repository;
// endregion: --- Modules

// region: --- Re-exports
pub use message_repository::MessageRepository;
pub use room_repository::RoomRepository;
pub use user_repository::UserRepository;
// endregion: --- Re-exports

// region: --- Types and Functions
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};

use crate::config::core_config;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new SQLite connection pool from the configured database URL.
pub async fn create_pool() -> anyhow::Result<DbPool> {
    let options = core_config()
        .database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    Ok(pool)
}
// endregion: --- Types and Functions
