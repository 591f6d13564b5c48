//! # Web Library
//!
//! HTTP/WebSocket surface, middleware, and the real-time chat core.
//!
//! The [`chat`] module is the session and delivery layer: presence
//! tracking, room multicast, the persist-then-broadcast send path, typing
//! signals, and cross-room notification fan-out. The [`handlers`] module is
//! the thin REST surface around it, and [`server`] wires everything into an
//! axum application.

pub mod chat;
pub mod handlers;
pub mod middleware;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use server::{start_server, AppState, ServerConfig};
