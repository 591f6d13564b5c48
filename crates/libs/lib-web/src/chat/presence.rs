//! # Presence Registry
//!
//! Maps a user identity to the set of currently live connections for that
//! user, across all rooms. This is the one structure every connection
//! touches concurrently; a single `RwLock` serializes register, unregister,
//! and reads so a reader never observes a connection mid-removal.
//!
//! Entries are rebuilt purely from connection lifecycle events and never
//! persisted: a user with no live connections has no entry at all.

use std::collections::HashMap;
use std::fmt;

use lib_core::dto::UserInfo;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::events::ServerEvent;

/// Identifier of one live transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sending side of one live connection.
///
/// Owned by exactly one user, set at authentication and never reassigned.
/// Cloning shares the underlying channel; the connection's forwarding task
/// holds the receiving side and drains events to the socket in FIFO order.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnId,
    pub user: UserInfo,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its forwarding task will drain.
    pub fn new(user: UserInfo) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnId::new(),
                user,
                tx,
            },
            rx,
        )
    }

    /// Queue an event for delivery. Non-blocking; returns `false` when the
    /// connection is gone (receiver dropped).
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// User id → live connections. See module docs.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    users: RwLock<HashMap<i64, HashMap<ConnId, ConnectionHandle>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to its user's live set. Idempotent per connection.
    pub async fn register(&self, handle: ConnectionHandle) {
        let mut users = self.users.write().await;
        users
            .entry(handle.user.id)
            .or_default()
            .insert(handle.id, handle);
    }

    /// Remove a connection from a user's live set, deleting the entry once
    /// it empties. Total: unknown user or connection is a no-op.
    pub async fn unregister(&self, user_id: i64, conn: ConnId) {
        let mut users = self.users.write().await;
        if let Some(connections) = users.get_mut(&user_id) {
            connections.remove(&conn);
            if connections.is_empty() {
                users.remove(&user_id);
            }
        }
    }

    /// Snapshot of the user's live connections; empty when none.
    pub async fn connections_of(&self, user_id: i64) -> Vec<ConnectionHandle> {
        let users = self.users.read().await;
        users
            .get(&user_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }
}
