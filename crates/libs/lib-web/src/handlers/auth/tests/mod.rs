//! # Auth Handler Tests
//!
//! Test suite for the register and login handlers.


use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::routing::post;
use axum::Router;
use lib_core::DbPool;
use tower::ServiceExt;

use super::*;
use crate::chat::{PresenceRegistry, RoomHub};
use crate::server::AppState;
use crate::test_support::{memory_pool, test_config};

/// Router with the auth routes and a fresh in-memory store.
pub async fn test_app() -> (Router, DbPool) {
    let pool = memory_pool().await;
    let state = AppState {
        db: pool.clone(),
        config: test_config(),
        presence: Arc::new(PresenceRegistry::new()),
        hub: Arc::new(RoomHub::new()),
    };

    let app = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .with_state(state);

    (app, pool)
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
