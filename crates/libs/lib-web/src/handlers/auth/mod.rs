//! # Authentication Handlers
//!
//! HTTP request handlers for account creation and login.
//!
//! Both endpoints return an [`AuthResponse`] whose token is the bearer
//! credential clients later present at WebSocket connection establishment.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use lib_auth::{hash_password, issue_token, verify_password};
use lib_core::dto::{AuthResponse, LoginRequest, RegisterRequest};
use lib_core::model::store::UserRepository;
use lib_core::{AppError, Config, DbPool};
use lib_utils::validate_username;
use tracing::{info, instrument, warn};

use crate::middleware::mw_auth::credential_error;

#[cfg(test)]
mod tests;

/// Register handler - creates a new account and signs the caller in.
///
/// # Validation
///
/// - Username: 3-32 chars, alphanumeric plus `_`/`-`, must be unused
/// - Password: at least 8 characters (enforced by the hasher)
#[instrument(skip(pool, config, req), fields(username = %req.username))]
pub async fn register(
    State(pool): State<DbPool>,
    State(config): State<Config>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_username(&req.username).map_err(AppError::InvalidInput)?;

    if UserRepository::find_by_username(&pool, &req.username)
        .await?
        .is_some()
    {
        warn!("[AUTH] Username already taken: {}", req.username);
        return Err(AppError::InvalidInput("Username already taken".to_string()));
    }

    let password_hash = hash_password(&req.password).map_err(credential_error)?;
    let user = UserRepository::create(&pool, &req.username, &password_hash).await?;

    let token = issue_token(
        user.id,
        &user.username,
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )
    .map_err(credential_error)?;

    info!("[AUTH] Registered user {} (id {})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.info(),
            token,
        }),
    ))
}

/// Login handler - verifies credentials and issues a bearer token.
///
/// Unknown username and wrong password are indistinguishable to the caller.
#[instrument(skip(pool, config, req), fields(username = %req.username))]
pub async fn login(
    State(pool): State<DbPool>,
    State(config): State<Config>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let Some(user) = UserRepository::find_by_username(&pool, &req.username).await? else {
        warn!("[AUTH] Login failed: unknown username");
        return Err(AppError::Unauthenticated("invalid credentials".to_string()));
    };

    let password_ok =
        verify_password(&req.password, &user.password_hash).map_err(credential_error)?;
    if !password_ok {
        warn!("[AUTH] Login failed: bad password for {}", user.username);
        return Err(AppError::Unauthenticated("invalid credentials".to_string()));
    }

    let token = issue_token(
        user.id,
        &user.username,
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )
    .map_err(credential_error)?;

    info!("[AUTH] Logged in user {} (id {})", user.username, user.id);

    Ok(Json(AuthResponse {
        user: user.info(),
        token,
    }))
}
