//! # Bearer Token Management
//!
//! JWT issue and verification for connection credentials.
//!
//! Tokens are issued at login and presented once, at connection
//! establishment; they are never renegotiated mid-session.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Claims carried by a relay bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id, stringified per JWT convention)
    pub sub: String,
    /// Username at issue time (display hint only; the store is authoritative)
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// The numeric subject id, or `Invalid` when the sub claim is not one.
    pub fn subject_id(&self) -> Result<i64, AuthError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AuthError::Invalid("subject is not a user id".to_string()))
    }
}

/// Issue a signed bearer token for a user.
pub fn issue_token(
    user_id: i64,
    username: &str,
    secret: &str,
    expiration_hours: i64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Invalid(e.to_string()))
}

/// Verify a bearer token's signature and expiry and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}
