//! # HTTP Request Handlers
//!
//! Axum handlers organized by feature domain.
//!
//! - **[`auth`]**: account creation and login
//!   - `POST /api/auth/register` - create an account, returns a bearer token
//!   - `POST /api/auth/login` - authenticate, returns a bearer token
//!
//! - **[`rooms`]**: the room/membership CRUD surface
//!   - `GET  /api/rooms` - rooms the caller belongs to
//!   - `POST /api/rooms` - create a room (group rooms get an invite code)
//!   - `GET  /api/rooms/search?query=` - find users to chat with
//!   - `GET  /api/rooms/{id}` - one room with participants and messages
//!   - `GET  /api/rooms/{id}/messages` - message history
//!   - `POST /api/rooms/{id}/add-user` - add a member
//!   - `POST /api/rooms/join-by-invite-code` - redeem an invite code
//!   - `POST /api/rooms/private/{target_user_id}` - open a private room
//!
//! - **[`websocket`]**: the real-time gateway
//!   - `GET /api/ws/chat` - authenticated WebSocket connection
//!
//! Protected endpoints sit behind [`crate::middleware::require_auth`] and
//! read the caller's identity from `Extension<Claims>`. Handlers return
//! `Result<_, AppError>`; the error type renders the HTTP response.

pub mod auth;
pub mod rooms;
pub mod websocket;
