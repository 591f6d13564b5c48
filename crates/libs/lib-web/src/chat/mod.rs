//! # Chat Core
//!
//! The real-time session and delivery layer.
//!
//! Connections authenticate once at upgrade, register with the
//! [`presence::PresenceRegistry`], and then issue join/leave/send/typing
//! requests that are dispatched by a [`session::ChatSession`]. Sends go
//! through the persist-then-broadcast path; room delivery happens through
//! the [`hub::RoomHub`]; membership-change notifications reach users on
//! every live connection through the [`notify::Notifier`], whether or not
//! they have the room open.
//!
//! The room logic and the connection logic never import each other:
//! handlers that mutate membership receive a `Notifier`, and the socket side
//! consults membership through the store repositories.

// region: --- Modules
pub mod events;
pub mod hub;
pub mod notify;
pub mod presence;
pub mod session;
// endregion: --- Modules

// region: --- Re-exports
pub use events::{AckStatus, ClientEvent, SendAck, ServerEvent};
pub use hub::RoomHub;
pub use notify::Notifier;
pub use presence::{ConnId, ConnectionHandle, PresenceRegistry};
pub use session::ChatSession;
// endregion: --- Re-exports
