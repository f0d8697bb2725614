/**
 * Connection Handle and Inbox
 *
 * Every live connection is split in two halves:
 *
 * - `ConnectionHandle` - cheap to clone, indexed by the registry; other
 *   tasks use it to add or drop room subscriptions.
 * - `ConnectionInbox` - owned by the connection's own task; it holds the
 *   subscription set (one broadcast stream per room) and yields the events
 *   to write to the socket.
 *
 * Subscription changes travel as commands over an unbounded channel, so
 * the registry never touches a socket and nothing blocks while its lock is
 * held. Receivers are created by the sender of the command, which means a
 * subscription observes every event published after the command was sent,
 * even before the connection task has processed it.
 *
 * # Leaving a room
 *
 * `Unsubscribe` may carry a fence: the last event the connection must
 * still see from that room. The inbox drains the room's buffer up to and
 * including the fence and drops anything after it.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use uuid::Uuid;

use super::bus::SharedEvent;
use super::rooms::RoomId;

pub type ConnectionId = Uuid;

/// Subscription change sent to a connection task
#[derive(Debug)]
pub enum ConnectionCommand {
    Subscribe(RoomId, broadcast::Receiver<SharedEvent>),
    Unsubscribe {
        room: RoomId,
        fence: Option<SharedEvent>,
    },
}

/// Registry-side half of a live connection
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: Uuid,
    commands: mpsc::UnboundedSender<ConnectionCommand>,
}

impl ConnectionHandle {
    /// Create a connection for `user_id`, returning both halves
    pub fn new(user_id: Uuid) -> (Self, ConnectionInbox) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let handle = Self {
            id,
            user_id,
            commands,
        };
        let inbox = ConnectionInbox {
            id,
            user_id,
            commands: command_rx,
            rooms: StreamMap::new(),
            pending: VecDeque::new(),
        };
        (handle, inbox)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Hand a room receiver to the connection.
    ///
    /// Returns `false` when the connection task is gone.
    pub fn subscribe(&self, room: RoomId, receiver: broadcast::Receiver<SharedEvent>) -> bool {
        self.commands
            .send(ConnectionCommand::Subscribe(room, receiver))
            .is_ok()
    }

    pub fn unsubscribe(&self, room: RoomId, fence: Option<SharedEvent>) -> bool {
        self.commands
            .send(ConnectionCommand::Unsubscribe { room, fence })
            .is_ok()
    }
}

enum Next {
    Command(Option<ConnectionCommand>),
    Room(RoomId, Result<SharedEvent, BroadcastStreamRecvError>),
}

/// Connection-side half: owns the subscription set
pub struct ConnectionInbox {
    id: ConnectionId,
    user_id: Uuid,
    commands: mpsc::UnboundedReceiver<ConnectionCommand>,
    rooms: StreamMap<RoomId, BroadcastStream<SharedEvent>>,
    pending: VecDeque<SharedEvent>,
}

impl ConnectionInbox {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Rooms currently subscribed, in no particular order
    pub fn rooms(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    pub fn is_subscribed(&self, room: RoomId) -> bool {
        self.rooms.contains_key(&room)
    }

    /// Apply queued subscription changes without waiting for events
    pub fn sync(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
    }

    /// Next event for this connection.
    ///
    /// Pending subscription changes are applied first. Returns `None` once
    /// every handle for this connection has been dropped. Cancel-safe.
    pub async fn recv(&mut self) -> Option<SharedEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let next = tokio::select! {
                biased;
                command = self.commands.recv() => Next::Command(command),
                Some((room, item)) = self.rooms.next() => Next::Room(room, item),
            };

            match next {
                Next::Command(Some(command)) => self.apply(command),
                Next::Command(None) => return None,
                Next::Room(_, Ok(event)) => return Some(event),
                Next::Room(room, Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(
                        "[Realtime] Connection {} of user {} lagged in {}, {} events skipped",
                        self.id,
                        self.user_id,
                        room,
                        skipped
                    );
                }
            }
        }
    }

    fn apply(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Subscribe(room, receiver) => {
                // a second subscription to the same room would double-deliver
                if !self.rooms.contains_key(&room) {
                    self.rooms.insert(room, BroadcastStream::new(receiver));
                }
            }
            ConnectionCommand::Unsubscribe { room, fence } => self.drop_room(room, fence),
        }
    }

    fn drop_room(&mut self, room: RoomId, fence: Option<SharedEvent>) {
        let Some(mut stream) = self.rooms.remove(&room) else {
            return;
        };
        let Some(fence) = fence else {
            return;
        };
        while let Some(Some(item)) = stream.next().now_or_never() {
            match item {
                Ok(event) => {
                    let reached = Arc::ptr_eq(&event, &fence);
                    self.pending.push_back(event);
                    if reached {
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("[Realtime] Lost {} events of {} while leaving", skipped, room);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ServerEvent;
    use std::time::Duration;

    fn left(group_id: Uuid) -> SharedEvent {
        Arc::new(ServerEvent::GroupLeft { group_id })
    }

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let (handle, mut inbox) = ConnectionHandle::new(Uuid::new_v4());
        let (tx, rx) = broadcast::channel(8);
        let room = RoomId::Group(Uuid::new_v4());

        assert!(handle.subscribe(room, rx));
        let event = left(Uuid::new_v4());
        tx.send(event.clone()).unwrap();

        let got = inbox.recv().await.unwrap();
        assert!(Arc::ptr_eq(&got, &event));
        assert!(inbox.is_subscribed(room));
    }

    #[tokio::test]
    async fn test_duplicate_subscription_is_ignored() {
        let (handle, mut inbox) = ConnectionHandle::new(Uuid::new_v4());
        let (tx, _) = broadcast::channel(8);
        let room = RoomId::User(Uuid::new_v4());

        handle.subscribe(room, tx.subscribe());
        handle.subscribe(room, tx.subscribe());
        inbox.sync();
        assert_eq!(inbox.rooms(), vec![room]);

        tx.send(left(Uuid::new_v4())).unwrap();
        assert!(inbox.recv().await.is_some());
        let second = tokio::time::timeout(Duration::from_millis(30), inbox.recv()).await;
        assert!(second.is_err(), "event delivered twice");
    }

    #[tokio::test]
    async fn test_unsubscribe_drains_up_to_fence() {
        let (handle, mut inbox) = ConnectionHandle::new(Uuid::new_v4());
        let (tx, rx) = broadcast::channel(8);
        let room = RoomId::Group(Uuid::new_v4());
        handle.subscribe(room, rx);
        inbox.sync();

        let before = left(Uuid::new_v4());
        let fence = left(Uuid::new_v4());
        let after = left(Uuid::new_v4());
        tx.send(before.clone()).unwrap();
        tx.send(fence.clone()).unwrap();
        handle.unsubscribe(room, Some(fence.clone()));
        tx.send(after).unwrap();

        assert!(Arc::ptr_eq(&inbox.recv().await.unwrap(), &before));
        assert!(Arc::ptr_eq(&inbox.recv().await.unwrap(), &fence));
        assert!(!inbox.is_subscribed(room));
        let rest = tokio::time::timeout(Duration::from_millis(30), inbox.recv()).await;
        assert!(rest.is_err(), "event after fence was delivered");
    }

    #[tokio::test]
    async fn test_closed_room_is_pruned() {
        let (handle, mut inbox) = ConnectionHandle::new(Uuid::new_v4());
        let (tx, rx) = broadcast::channel(8);
        let room = RoomId::Group(Uuid::new_v4());
        handle.subscribe(room, rx);
        tx.send(left(Uuid::new_v4())).unwrap();
        drop(tx);

        assert!(inbox.recv().await.is_some());
        let _ = tokio::time::timeout(Duration::from_millis(30), inbox.recv()).await;
        assert!(!inbox.is_subscribed(room));
    }

    #[tokio::test]
    async fn test_recv_ends_when_handles_drop() {
        let (handle, mut inbox) = ConnectionHandle::new(Uuid::new_v4());
        drop(handle);
        assert!(inbox.recv().await.is_none());
    }
}
