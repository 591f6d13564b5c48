//! # Application Configuration
//!
//! This module manages application configuration loaded from environment
//! variables. All configuration is validated on startup to fail fast if
//! misconfigured.
//!
//! ## Global Config Access
//!
//! Use [`core_config()`] to access the global configuration instance after a
//! single [`init_config()`] call at startup.

use std::sync::OnceLock;

use lib_utils::envs::{get_env, get_env_or};

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Secret key for bearer-token signing and verification
    ///
    /// **Must be at least 32 characters long**.
    pub jwt_secret: String,

    /// Bearer-token validity period in hours
    ///
    /// Valid range: 1-720 hours (1 hour to 30 days).
    pub jwt_expiration_hours: i64,

    /// Maximum accepted chat message length, in characters
    pub max_message_len: usize,

    /// Whether the author of a message also receives the room broadcast,
    /// in addition to the acknowledgment that is always sent
    pub echo_to_sender: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = get_env_or("DATABASE_URL", "sqlite:data/relay.db");

        let jwt_secret = get_env("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set in environment")?;

        let jwt_expiration_hours = get_env_or("JWT_EXPIRATION_HOURS", "24")
            .parse()
            .map_err(|e| format!("JWT_EXPIRATION_HOURS must be a valid number: {}", e))?;

        let max_message_len = get_env_or("MAX_MESSAGE_LEN", "2000")
            .parse()
            .map_err(|e| format!("MAX_MESSAGE_LEN must be a valid number: {}", e))?;

        let echo_to_sender = get_env_or("ECHO_TO_SENDER", "true")
            .parse()
            .map_err(|e| format!("ECHO_TO_SENDER must be true or false: {}", e))?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            max_message_len,
            echo_to_sender,
        })
    }

    /// Validate configuration values against security and business rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".to_string());
        }

        if self.jwt_expiration_hours < 1 || self.jwt_expiration_hours > 720 {
            return Err("JWT_EXPIRATION_HOURS must be between 1 and 720 (30 days)".to_string());
        }

        if self.max_message_len == 0 {
            return Err("MAX_MESSAGE_LEN must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize the global configuration.
///
/// Must be called once at application startup, before any handler or
/// middleware that needs configuration runs.
pub fn init_config() -> Result<(), String> {
    let config = Config::from_env()?;
    config.validate()?;

    CONFIG
        .set(config)
        .map_err(|_| "Config has already been initialized".to_string())
}

/// Get a reference to the global configuration.
///
/// # Panics
///
/// Panics if [`init_config()`] has not been called yet.
pub fn core_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Config must be initialized with init_config() before use")
}
