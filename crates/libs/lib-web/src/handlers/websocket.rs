//! # WebSocket Gateway
//!
//! The real-time chat endpoint: `GET /api/ws/chat`.
//!
//! The bearer credential rides on the upgrade request itself — `?token=`
//! query parameter (browsers cannot set headers on WebSocket connects) or
//! the `Authorization: Bearer` header. Authentication happens before the
//! upgrade completes, so an unauthenticated connection never exists: a bad
//! credential refuses the handshake with 401 and no session, presence
//! entry, or subscription is ever created.
//!
//! After upgrade, one task per connection reads frames and dispatches them
//! through a [`ChatSession`], awaiting each event before reading the next —
//! this is what serializes a connection's operations. A second task drains
//! the connection's outbox channel into the socket in FIFO order. On
//! teardown (close frame, transport error, or dead sink) the connection's
//! room subscriptions and presence entry are removed.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use lib_auth::verify_token;
use lib_core::dto::UserInfo;
use lib_core::model::store::UserRepository;
use lib_core::AppError;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatSession, ClientEvent, ConnectionHandle, ServerEvent};
use crate::middleware::mw_auth::credential_error;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// WebSocket handler for the chat gateway.
///
/// **Route**: `GET /api/ws/chat?token=<bearer>`
pub async fn chat_websocket(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let user = match authenticate(&query, &headers, &state).await {
        Ok(user) => user,
        Err(err) => {
            warn!("[WS] CONNECT_REFUSED: {}", err);
            return err.into_response();
        }
    };

    info!("[WS] CONNECT user={} ({})", user.username, user.id);
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state, user))
}

/// Resolve the upgrade request's credential to a live user.
///
/// Pure verification: token signature/expiry via the credential verifier,
/// then the subject looked up in the store. A subject that no longer
/// resolves fails authentication even if the token itself is valid.
async fn authenticate(
    query: &WsAuthQuery,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<UserInfo, AppError> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = query
        .token
        .as_deref()
        .or(bearer)
        .ok_or_else(|| AppError::Unauthenticated("missing credential".to_string()))?;

    let claims =
        verify_token(token, &state.config.jwt_secret).map_err(credential_error)?;
    let user_id = claims.subject_id().map_err(credential_error)?;

    let user = UserRepository::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("user no longer exists".to_string()))?;

    Ok(user.info())
}

/// Drive one authenticated connection until its transport closes.
async fn handle_chat_socket(socket: WebSocket, state: AppState, user: UserInfo) {
    let (handle, mut outbox) = ConnectionHandle::new(user.clone());
    let conn_id = handle.id;

    state.presence.register(handle.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Forwarding task: outbox → socket, FIFO. Dies when the channel closes
    // or the sink errors.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("[WS] SERIALIZE_ERROR conn={} error={}", conn_id, e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let session = ChatSession::new(
        state.db.clone(),
        state.config.clone(),
        state.hub.clone(),
        handle.clone(),
    );

    // Event loop. Events are dispatched one at a time: a connection's
    // operations are processed in arrival order.
    loop {
        tokio::select! {
            _ = &mut send_task => {
                debug!("[WS] sink closed for conn={}", conn_id);
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => session.handle_event(event).await,
                        Err(e) => {
                            debug!("[WS] bad frame from conn={}: {}", conn_id, e);
                            handle.send(ServerEvent::Error {
                                reason: "InvalidInput".to_string(),
                            });
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                // Ping/pong are answered at the protocol layer; binary
                // frames are not part of this protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("[WS] RECV_ERROR conn={} error={}", conn_id, e);
                    break;
                }
            }
        }
    }

    // Teardown: subscriptions first (atomic wrt concurrent publishes),
    // then the presence entry.
    state.hub.remove_connection(conn_id).await;
    state.presence.unregister(user.id, conn_id).await;
    send_task.abort();

    info!("[WS] DISCONNECTED user={} conn={}", user.id, conn_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{PresenceRegistry, RoomHub};
    use crate::test_support::{memory_pool, seed_user, test_config};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use lib_auth::issue_token;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> (Router, lib_core::DbPool) {
        let pool = memory_pool().await;
        let state = AppState {
            db: pool.clone(),
            config: test_config(),
            presence: Arc::new(PresenceRegistry::new()),
            hub: Arc::new(RoomHub::new()),
        };
        let app = Router::new()
            .route("/api/ws/chat", get(chat_websocket))
            .with_state(state);
        (app, pool)
    }

    fn upgrade_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("host", "localhost")
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn upgrade_refused_without_credential() {
        let (app, _pool) = test_app().await;

        let response = app.oneshot(upgrade_request("/api/ws/chat")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upgrade_refused_with_bad_token() {
        let (app, _pool) = test_app().await;

        let response = app
            .oneshot(upgrade_request("/api/ws/chat?token=not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upgrade_refused_for_deleted_user() {
        let (app, _pool) = test_app().await;

        // Token is well-formed but its subject does not exist in the store.
        let token = issue_token(424242, "ghost", &test_config().jwt_secret, 1).unwrap();
        let response = app
            .oneshot(upgrade_request(&format!("/api/ws/chat?token={token}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upgrade_accepted_with_valid_token() {
        let (app, pool) = test_app().await;
        let alice = seed_user(&pool, "alice").await;

        let token = issue_token(alice.id, &alice.username, &test_config().jwt_secret, 1).unwrap();
        let response = app
            .oneshot(upgrade_request(&format!("/api/ws/chat?token={token}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    }
}
