//! # Chat Session
//!
//! Per-connection dispatch of protocol events, including the message
//! persistence coordinator.
//!
//! One `ChatSession` exists per live connection, driven by that
//! connection's socket task. The task awaits each event to completion
//! before reading the next frame, which is what serializes a connection's
//! operations: two sends issued back-to-back on one connection are
//! persisted and broadcast in issue order. Sends from different connections
//! interleave in the store's commit order.
//!
//! Membership is re-checked against the store on every join, send, and
//! typing signal rather than cached: it can change out-of-band while the
//! session is open. A store failure denies the operation (`Transient`),
//! never fails open.

use std::sync::Arc;

use lib_core::dto::Message;
use lib_core::model::store::{MessageRepository, RoomRepository};
use lib_core::{AppError, Config, DbPool};
use lib_utils::{validate_max_length, validate_not_blank};
use tracing::debug;

use super::events::{ClientEvent, SendAck, ServerEvent};
use super::hub::RoomHub;
use super::presence::ConnectionHandle;

/// Dispatcher for one authenticated connection's protocol events.
pub struct ChatSession {
    db: DbPool,
    config: Config,
    hub: Arc<RoomHub>,
    handle: ConnectionHandle,
}

impl ChatSession {
    pub fn new(db: DbPool, config: Config, hub: Arc<RoomHub>, handle: ConnectionHandle) -> Self {
        Self {
            db,
            config,
            hub,
            handle,
        }
    }

    /// Handle one client event. Failures are reported to this connection
    /// only and never tear the session down.
    pub async fn handle_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom { chat_room_id } => {
                if let Err(err) = self.join_room(chat_room_id).await {
                    self.report(&err);
                }
            }
            ClientEvent::LeaveRoom { chat_room_id } => {
                self.leave_room(chat_room_id).await;
            }
            ClientEvent::SendMessage { chat_room_id, text } => {
                match self.send_message(chat_room_id, &text).await {
                    Ok(message) => {
                        self.handle.send(ServerEvent::Ack(SendAck::ok(message)));
                    }
                    Err(err) => {
                        debug!(
                            "[WS] send by user {} to room {} rejected: {}",
                            self.handle.user.id, chat_room_id, err
                        );
                        self.handle.send(ServerEvent::Ack(SendAck::error(&err)));
                    }
                }
            }
            ClientEvent::Typing {
                chat_room_id,
                is_typing,
            } => {
                if let Err(err) = self.set_typing(chat_room_id, is_typing).await {
                    self.report(&err);
                }
            }
        }
    }

    /// Subscribe this connection to a room's live events.
    pub async fn join_room(&self, room_id: i64) -> Result<(), AppError> {
        self.require_membership(room_id).await?;
        self.hub.join(room_id, self.handle.clone()).await;
        self.handle.send(ServerEvent::Joined {
            chat_room_id: room_id,
        });
        Ok(())
    }

    /// Unsubscribe from a room. Total: leaving a room never joined is fine.
    pub async fn leave_room(&self, room_id: i64) {
        self.hub.leave(room_id, self.handle.id).await;
        self.handle.send(ServerEvent::Left {
            chat_room_id: room_id,
        });
    }

    /// The persist-then-broadcast send path, in strict order:
    ///
    /// 1. validate the text before touching the store;
    /// 2. re-verify membership (join-time checks may be stale);
    /// 3. persist, obtaining the canonical id and timestamp;
    /// 4. broadcast the canonical message to the room;
    /// 5. return it for the sender's acknowledgment.
    ///
    /// A failure at any step means no broadcast happened and the message is
    /// dropped entirely; retrying is the caller's decision with a fresh
    /// send.
    pub async fn send_message(&self, room_id: i64, text: &str) -> Result<Message, AppError> {
        let text = text.trim();
        validate_not_blank(text, "message text").map_err(AppError::InvalidInput)?;
        validate_max_length(text, self.config.max_message_len, "message text")
            .map_err(AppError::InvalidInput)?;

        self.require_membership(room_id).await?;

        let record = MessageRepository::create(&self.db, room_id, self.handle.user.id, text).await?;
        let message: Message = record.into();

        let except = if self.config.echo_to_sender {
            None
        } else {
            Some(self.handle.id)
        };
        self.hub
            .publish(
                room_id,
                &ServerEvent::NewMessage {
                    message: message.clone(),
                },
                except,
            )
            .await;

        Ok(message)
    }

    /// Broadcast an ephemeral typing signal to the rest of the room. Level-
    /// triggered and unacknowledged; repeating a state is harmless.
    pub async fn set_typing(&self, room_id: i64, is_typing: bool) -> Result<(), AppError> {
        self.require_membership(room_id).await?;

        self.hub
            .publish(
                room_id,
                &ServerEvent::UserTyping {
                    chat_room_id: room_id,
                    user_id: self.handle.user.id,
                    username: self.handle.user.username.clone(),
                    is_typing,
                },
                Some(self.handle.id),
            )
            .await;
        Ok(())
    }

    async fn require_membership(&self, room_id: i64) -> Result<(), AppError> {
        let is_member =
            RoomRepository::is_participant(&self.db, self.handle.user.id, room_id).await?;
        if !is_member {
            return Err(AppError::Forbidden(format!(
                "user {} is not a member of room {}",
                self.handle.user.id, room_id
            )));
        }
        Ok(())
    }

    fn report(&self, err: &AppError) {
        debug!("[WS] operation by user {} rejected: {}", self.handle.user.id, err);
        self.handle.send(ServerEvent::error(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::events::AckStatus;
    use crate::chat::presence::ConnectionHandle;
    use crate::test_support::{memory_pool, seed_user, test_config};
    use lib_core::dto::UserInfo;
    use lib_core::model::store::RoomRepository;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        db: DbPool,
        hub: Arc<RoomHub>,
        config: Config,
    }

    impl Fixture {
        async fn new() -> Self {
            Self {
                db: memory_pool().await,
                hub: Arc::new(RoomHub::new()),
                config: test_config(),
            }
        }

        fn session_for(&self, user: &UserInfo) -> (ChatSession, UnboundedReceiver<ServerEvent>) {
            let (handle, rx) = ConnectionHandle::new(user.clone());
            (
                ChatSession::new(
                    self.db.clone(),
                    self.config.clone(),
                    self.hub.clone(),
                    handle,
                ),
                rx,
            )
        }
    }

    fn expect_ok_ack(event: ServerEvent) -> Message {
        match event {
            ServerEvent::Ack(ack) => {
                assert_eq!(ack.status, AckStatus::Ok);
                ack.message.expect("ok ack must carry the canonical message")
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn member_can_join_and_receive() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let bob = seed_user(&fx.db, "bob").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();
        RoomRepository::add_participant(&fx.db, bob.id, room.id).await.unwrap();

        let (alice_session, mut alice_rx) = fx.session_for(&alice);
        let (bob_session, mut bob_rx) = fx.session_for(&bob);

        alice_session.handle_event(ClientEvent::JoinRoom { chat_room_id: room.id }).await;
        bob_session.handle_event(ClientEvent::JoinRoom { chat_room_id: room.id }).await;
        assert!(matches!(alice_rx.try_recv(), Ok(ServerEvent::Joined { .. })));
        assert!(matches!(bob_rx.try_recv(), Ok(ServerEvent::Joined { .. })));

        alice_session
            .handle_event(ClientEvent::SendMessage {
                chat_room_id: room.id,
                text: "hi".to_string(),
            })
            .await;

        // Subscriber sees the canonical message.
        let delivered = match bob_rx.try_recv() {
            Ok(ServerEvent::NewMessage { message }) => message,
            other => panic!("expected newMessage, got {other:?}"),
        };
        assert_eq!(delivered.text, "hi");
        assert_eq!(delivered.user.username, "alice");
        assert!(delivered.id > 0);

        // Sender sees the echo first (echo_to_sender on), then the ack with
        // the same canonical id.
        assert!(matches!(alice_rx.try_recv(), Ok(ServerEvent::NewMessage { .. })));
        let acked = expect_ok_ack(alice_rx.try_recv().unwrap());
        assert_eq!(acked.id, delivered.id);
    }

    #[tokio::test]
    async fn non_member_send_is_forbidden_and_silent() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let carol = seed_user(&fx.db, "carol").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();

        let (alice_session, mut alice_rx) = fx.session_for(&alice);
        alice_session.join_room(room.id).await.unwrap();
        alice_rx.try_recv().ok();

        let (carol_session, mut carol_rx) = fx.session_for(&carol);
        carol_session
            .handle_event(ClientEvent::SendMessage {
                chat_room_id: room.id,
                text: "let me in".to_string(),
            })
            .await;

        match carol_rx.try_recv() {
            Ok(ServerEvent::Ack(ack)) => {
                assert_eq!(ack.status, AckStatus::Error);
                assert_eq!(ack.reason.as_deref(), Some("Forbidden"));
            }
            other => panic!("expected error ack, got {other:?}"),
        }

        // No one saw the text, and nothing was persisted.
        assert!(alice_rx.try_recv().is_err());
        let history = MessageRepository::list_for_room(&fx.db, room.id, 50).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn non_member_join_and_typing_are_forbidden() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let carol = seed_user(&fx.db, "carol").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();

        let (carol_session, mut carol_rx) = fx.session_for(&carol);

        carol_session.handle_event(ClientEvent::JoinRoom { chat_room_id: room.id }).await;
        assert!(matches!(
            carol_rx.try_recv(),
            Ok(ServerEvent::Error { reason }) if reason == "Forbidden"
        ));

        carol_session
            .handle_event(ClientEvent::Typing { chat_room_id: room.id, is_typing: true })
            .await;
        assert!(matches!(
            carol_rx.try_recv(),
            Ok(ServerEvent::Error { reason }) if reason == "Forbidden"
        ));
    }

    #[tokio::test]
    async fn blank_text_rejected_before_store() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();

        let (session, _rx) = fx.session_for(&alice);
        let err = session.send_message(room.id, "   ").await.unwrap_err();
        assert_eq!(err.code(), "InvalidInput");

        let history = MessageRepository::list_for_room(&fx.db, room.id, 50).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn over_length_text_rejected() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();

        let (session, _rx) = fx.session_for(&alice);
        let long = "x".repeat(fx.config.max_message_len + 1);
        let err = session.send_message(room.id, &long).await.unwrap_err();
        assert_eq!(err.code(), "InvalidInput");
    }

    #[tokio::test]
    async fn one_connection_sends_are_observed_in_issue_order() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let bob = seed_user(&fx.db, "bob").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();
        RoomRepository::add_participant(&fx.db, bob.id, room.id).await.unwrap();

        let (alice_session, _alice_rx) = fx.session_for(&alice);
        let (bob_session, mut bob_rx) = fx.session_for(&bob);
        bob_session.join_room(room.id).await.unwrap();
        bob_rx.try_recv().ok();

        // The socket task awaits each event before the next one; the same
        // sequencing applies here.
        alice_session
            .handle_event(ClientEvent::SendMessage {
                chat_room_id: room.id,
                text: "first".to_string(),
            })
            .await;
        alice_session
            .handle_event(ClientEvent::SendMessage {
                chat_room_id: room.id,
                text: "second".to_string(),
            })
            .await;

        let mut seen = Vec::new();
        while let Ok(ServerEvent::NewMessage { message }) = bob_rx.try_recv() {
            seen.push(message);
        }
        assert_eq!(
            seen.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        assert!(seen[0].id < seen[1].id);
    }

    #[tokio::test]
    async fn echo_to_sender_off_still_acks() {
        let fx = Fixture::new().await;
        let mut config = test_config();
        config.echo_to_sender = false;

        let alice = seed_user(&fx.db, "alice").await;
        let bob = seed_user(&fx.db, "bob").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();
        RoomRepository::add_participant(&fx.db, bob.id, room.id).await.unwrap();

        let (alice_handle, mut alice_rx) = ConnectionHandle::new(alice.clone());
        let alice_session =
            ChatSession::new(fx.db.clone(), config, fx.hub.clone(), alice_handle);
        let (bob_session, mut bob_rx) = fx.session_for(&bob);

        alice_session.join_room(room.id).await.unwrap();
        alice_rx.try_recv().ok();
        bob_session.join_room(room.id).await.unwrap();
        bob_rx.try_recv().ok();

        alice_session
            .handle_event(ClientEvent::SendMessage {
                chat_room_id: room.id,
                text: "quiet".to_string(),
            })
            .await;

        // Sender: ack only, no room echo.
        let acked = expect_ok_ack(alice_rx.try_recv().unwrap());
        assert_eq!(acked.text, "quiet");
        assert!(alice_rx.try_recv().is_err());

        // Other members still get the broadcast.
        assert!(matches!(bob_rx.try_recv(), Ok(ServerEvent::NewMessage { .. })));
    }

    #[tokio::test]
    async fn typing_reaches_others_but_not_sender() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let bob = seed_user(&fx.db, "bob").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();
        RoomRepository::add_participant(&fx.db, bob.id, room.id).await.unwrap();

        let (alice_session, mut alice_rx) = fx.session_for(&alice);
        let (bob_session, mut bob_rx) = fx.session_for(&bob);
        alice_session.join_room(room.id).await.unwrap();
        bob_session.join_room(room.id).await.unwrap();
        alice_rx.try_recv().ok();
        bob_rx.try_recv().ok();

        alice_session.set_typing(room.id, true).await.unwrap();

        match bob_rx.try_recv() {
            Ok(ServerEvent::UserTyping { user_id, username, is_typing, .. }) => {
                assert_eq!(user_id, alice.id);
                assert_eq!(username, "alice");
                assert!(is_typing);
            }
            other => panic!("expected userTyping, got {other:?}"),
        }
        assert!(alice_rx.try_recv().is_err());

        // Nothing was persisted for a typing signal.
        let history = MessageRepository::list_for_room(&fx.db, room.id, 50).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn leave_stops_room_delivery() {
        let fx = Fixture::new().await;
        let alice = seed_user(&fx.db, "alice").await;
        let bob = seed_user(&fx.db, "bob").await;
        let room = RoomRepository::create(&fx.db, "general", false, None, alice.id)
            .await
            .unwrap();
        RoomRepository::add_participant(&fx.db, bob.id, room.id).await.unwrap();

        let (alice_session, _alice_rx) = fx.session_for(&alice);
        let (bob_session, mut bob_rx) = fx.session_for(&bob);
        bob_session.join_room(room.id).await.unwrap();
        bob_rx.try_recv().ok();

        bob_session.leave_room(room.id).await;
        assert!(matches!(bob_rx.try_recv(), Ok(ServerEvent::Left { .. })));

        alice_session.send_message(room.id, "after leave").await.unwrap();
        assert!(bob_rx.try_recv().is_err());
    }
}
