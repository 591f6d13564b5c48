//! # Authentication Middleware
//!
//! Axum middleware for bearer-token validation on the REST surface.
//!
//! Extracts and validates the `Authorization: Bearer <token>` header, then
//! injects the verified [`Claims`](lib_auth::Claims) into request
//! extensions. Handlers behind
//! this layer read the caller's identity with `Extension<Claims>` and never
//! see unauthenticated traffic.
//!
//! The WebSocket endpoint does not sit behind this layer: its credential may
//! arrive as a query parameter and a failure there must refuse the upgrade,
//! so it authenticates in the handler itself.

use axum::{extract::Request, http::header::AUTHORIZATION, middleware::Next, response::Response};
use lib_auth::{verify_token, AuthError};
use lib_core::config::core_config;
use lib_core::AppError;
use tracing::{debug, warn};

/// Map a credential failure onto the application error taxonomy.
pub(crate) fn credential_error(err: AuthError) -> AppError {
    match err {
        AuthError::Expired => AppError::Unauthenticated("credential expired".to_string()),
        AuthError::Invalid(msg) => AppError::Unauthenticated(msg),
        AuthError::PasswordTooShort => AppError::InvalidInput(err.to_string()),
        AuthError::Hash(msg) => AppError::Internal(msg),
    }
}

/// Bearer-token authentication middleware.
///
/// - **Valid token**: continues with [`Claims`](lib_auth::Claims) in
///   request extensions.
/// - **Missing/invalid token**: responds `401 Unauthorized`.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("[AUTH] Missing Authorization header");
            AppError::Unauthenticated("missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("[AUTH] Invalid Authorization header format");
        AppError::Unauthenticated("expected a Bearer token".to_string())
    })?;

    let config = core_config();
    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        warn!("[AUTH] Token validation failed: {}", e);
        credential_error(e)
    })?;

    debug!("[AUTH] Authenticated user: {} (id: {})", claims.username, claims.sub);

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
