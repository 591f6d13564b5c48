//! # Data Transfer Objects (DTOs)
//!
//! Wire-facing data structures shared by the REST surface and the socket
//! protocol.

pub mod auth;
pub mod chat;

pub use auth::*;
pub use chat::*;
