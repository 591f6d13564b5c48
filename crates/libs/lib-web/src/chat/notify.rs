//! # Notification Fan-out
//!
//! Delivers out-of-band events to every live connection of a user,
//! independent of room subscription. This is how a user who does not have a
//! room open learns they were just added to it.
//!
//! Fan-out is best-effort and must never fail or block the membership
//! operation that triggered it: delivery failures are logged at debug and
//! swallowed, and a user with no live connections is simply a no-op (they
//! will see the new room on their next room-list fetch).

use std::sync::Arc;

use tracing::debug;

use super::events::ServerEvent;
use super::presence::PresenceRegistry;

/// Handle for pushing events to users by identity rather than by room.
///
/// Cloneable and cheap; injected into the membership-mutating handlers so
/// the room logic never imports the connection logic.
#[derive(Clone)]
pub struct Notifier {
    presence: Arc<PresenceRegistry>,
}

impl Notifier {
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self { presence }
    }

    /// Deliver `event` to each live connection of `user_id`.
    pub async fn notify_user(&self, user_id: i64, event: ServerEvent) {
        let connections = self.presence.connections_of(user_id).await;
        if connections.is_empty() {
            debug!("[NOTIFY] user {} has no live connections, dropping event", user_id);
            return;
        }
        for handle in connections {
            if !handle.send(event.clone()) {
                debug!("[NOTIFY] connection {} of user {} is gone", handle.id, user_id);
            }
        }
    }
}
