//! # Room Multicast Hub
//!
//! Per-room subscription sets and event delivery.
//!
//! Subscription state lives only as long as the connection: joining records
//! the connection under the room, teardown removes the connection from every
//! room it had open. Both maps sit behind one `RwLock` so teardown is atomic
//! with respect to a publish in flight — a departing connection receives a
//! concurrent publish at most once, never a partial membership view.
//!
//! Delivery is best-effort per connection. Queuing into a connection's
//! channel never blocks, so one slow socket cannot stall delivery to the
//! rest of the room; a connection whose channel is closed gets its
//! subscriptions dropped instead of propagating the failure to the
//! publisher.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

use super::events::ServerEvent;
use super::presence::{ConnId, ConnectionHandle};

#[derive(Debug, Default)]
struct HubInner {
    /// room id → subscribed connections
    rooms: HashMap<i64, HashMap<ConnId, ConnectionHandle>>,
    /// connection → rooms it is subscribed to (reverse index for teardown)
    joined: HashMap<ConnId, HashSet<i64>>,
}

impl HubInner {
    fn remove_subscription(&mut self, room_id: i64, conn: ConnId) {
        if let Some(subscribers) = self.rooms.get_mut(&room_id) {
            subscribers.remove(&conn);
            if subscribers.is_empty() {
                self.rooms.remove(&room_id);
            }
        }
        if let Some(rooms) = self.joined.get_mut(&conn) {
            rooms.remove(&room_id);
            if rooms.is_empty() {
                self.joined.remove(&conn);
            }
        }
    }
}

/// Per-room channel set. See module docs.
#[derive(Debug, Default)]
pub struct RoomHub {
    inner: RwLock<HubInner>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a room. Idempotent. The caller has already
    /// verified membership; the hub only tracks subscriptions.
    pub async fn join(&self, room_id: i64, handle: ConnectionHandle) {
        let mut inner = self.inner.write().await;
        inner.joined.entry(handle.id).or_default().insert(room_id);
        inner.rooms.entry(room_id).or_default().insert(handle.id, handle);
    }

    /// Unsubscribe a connection from a room. No-op if absent.
    pub async fn leave(&self, room_id: i64, conn: ConnId) {
        let mut inner = self.inner.write().await;
        inner.remove_subscription(room_id, conn);
    }

    /// Deliver an event to every connection currently subscribed to the
    /// room, except `except` (used for sender exclusion). Connections whose
    /// channel has closed are pruned from all their subscriptions.
    pub async fn publish(&self, room_id: i64, event: &ServerEvent, except: Option<ConnId>) {
        let dead: Vec<ConnId> = {
            let inner = self.inner.read().await;
            let Some(subscribers) = inner.rooms.get(&room_id) else {
                return;
            };
            subscribers
                .values()
                .filter(|handle| Some(handle.id) != except)
                .filter(|handle| !handle.send(event.clone()))
                .map(|handle| handle.id)
                .collect()
        };

        if !dead.is_empty() {
            let mut inner = self.inner.write().await;
            for conn in dead {
                debug!("[HUB] pruning dead connection {} from room {}", conn, room_id);
                for room in inner.joined.get(&conn).cloned().unwrap_or_default() {
                    inner.remove_subscription(room, conn);
                }
            }
        }
    }

    /// Drop all of a connection's subscriptions, atomically with respect to
    /// concurrent publishes. Called on transport teardown.
    pub async fn remove_connection(&self, conn: ConnId) {
        let mut inner = self.inner.write().await;
        for room in inner.joined.get(&conn).cloned().unwrap_or_default() {
            inner.remove_subscription(room, conn);
        }
    }

    /// Is the connection currently subscribed to the room?
    pub async fn is_subscribed(&self, room_id: i64, conn: ConnId) -> bool {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(&room_id)
            .is_some_and(|subscribers| subscribers.contains_key(&conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::presence::ConnectionHandle;
    use lib_core::dto::UserInfo;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connection(user_id: i64) -> (ConnectionHandle, UnboundedReceiver<ServerEvent>) {
        ConnectionHandle::new(UserInfo {
            id: user_id,
            username: format!("user{user_id}"),
        })
    }

    fn joined_event(room: i64) -> ServerEvent {
        ServerEvent::Joined { chat_room_id: room }
    }

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let hub = RoomHub::new();
        let (a, mut rx_a) = connection(1);
        let (b, mut rx_b) = connection(2);

        hub.join(7, a).await;
        hub.join(7, b).await;

        hub.publish(7, &joined_event(7), None).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn except_skips_the_sender() {
        let hub = RoomHub::new();
        let (a, mut rx_a) = connection(1);
        let (b, mut rx_b) = connection(2);
        let a_id = a.id;

        hub.join(7, a).await;
        hub.join(7, b).await;

        hub.publish(7, &joined_event(7), Some(a_id)).await;

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn leave_stops_delivery() {
        let hub = RoomHub::new();
        let (a, mut rx_a) = connection(1);
        let a_id = a.id;

        hub.join(7, a).await;
        hub.leave(7, a_id).await;

        hub.publish(7, &joined_event(7), None).await;
        assert!(rx_a.try_recv().is_err());

        // Leaving a room never joined is a no-op.
        hub.leave(99, a_id).await;
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let hub = RoomHub::new();
        let (a, mut rx_a) = connection(1);

        hub.join(7, a.clone()).await;
        hub.join(7, a).await;

        hub.publish(7, &joined_event(7), None).await;
        assert!(rx_a.try_recv().is_ok());
        // A double join must not double delivery.
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn teardown_clears_every_room() {
        let hub = RoomHub::new();
        let (a, mut rx_a) = connection(1);
        let a_id = a.id;

        hub.join(7, a.clone()).await;
        hub.join(8, a).await;
        assert!(hub.is_subscribed(8, a_id).await);

        hub.remove_connection(a_id).await;

        assert!(!hub.is_subscribed(7, a_id).await);
        assert!(!hub.is_subscribed(8, a_id).await);
        hub.publish(7, &joined_event(7), None).await;
        hub.publish(8, &joined_event(8), None).await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_connection_is_pruned_on_publish() {
        let hub = RoomHub::new();
        let (a, rx_a) = connection(1);
        let (b, mut rx_b) = connection(2);
        let a_id = a.id;

        hub.join(7, a.clone()).await;
        hub.join(8, a).await;
        hub.join(7, b).await;

        // Simulate a broken transport: the receiving side is gone.
        drop(rx_a);

        hub.publish(7, &joined_event(7), None).await;

        // Delivery to the healthy connection was not disturbed.
        assert!(rx_b.try_recv().is_ok());
        // The dead connection lost all its subscriptions, not just room 7.
        assert!(!hub.is_subscribed(7, a_id).await);
        assert!(!hub.is_subscribed(8, a_id).await);
    }

    #[tokio::test]
    async fn publish_to_empty_room_is_a_no_op() {
        let hub = RoomHub::new();
        hub.publish(123, &joined_event(123), None).await;
    }
}
