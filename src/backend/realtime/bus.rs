/**
 * Room Bus
 *
 * Pub/sub between the code that publishes room events and the connections
 * that deliver them. `RoomBus` is the seam: `LocalRoomBus` keeps one
 * `tokio::sync::broadcast` channel per room inside this process, and a
 * multi-instance deployment can plug in a bus that also forwards to its
 * peers.
 *
 * # Channels
 *
 * A room's channel is created on first subscription and dropped either by
 * `close_room` (group deleted) or by the periodic sweep once nobody is
 * subscribed. Dropping the sender ends every subscriber's stream after
 * it has drained what was already buffered.
 */

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::rooms::RoomId;
use crate::shared::ServerEvent;

/// Event as carried on the bus; shared between all subscribers
pub type SharedEvent = Arc<ServerEvent>;

pub trait RoomBus: Send + Sync + 'static {
    /// Publish to the subscribers of `room`, returning how many there were
    fn publish(&self, room: RoomId, event: SharedEvent) -> usize;

    /// Subscribe to events published to `room` from now on
    fn subscribe(&self, room: RoomId) -> broadcast::Receiver<SharedEvent>;

    /// Drop the room so every current subscription ends
    fn close_room(&self, room: RoomId);

    fn subscriber_count(&self, room: RoomId) -> usize;

    /// Drop rooms nobody listens to, returning how many were removed
    fn cleanup_inactive(&self) -> usize;
}

/// In-process bus with one broadcast channel per room
pub struct LocalRoomBus {
    channels: Mutex<HashMap<RoomId, broadcast::Sender<SharedEvent>>>,
    capacity: usize,
}

impl LocalRoomBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn room_count(&self) -> usize {
        self.channels.lock().len()
    }
}

impl RoomBus for LocalRoomBus {
    fn publish(&self, room: RoomId, event: SharedEvent) -> usize {
        match self.channels.lock().get(&room) {
            // Err only means nobody is listening right now
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    fn subscribe(&self, room: RoomId) -> broadcast::Receiver<SharedEvent> {
        let mut channels = self.channels.lock();
        channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    fn close_room(&self, room: RoomId) {
        if self.channels.lock().remove(&room).is_some() {
            tracing::debug!("[Realtime] Closed room {}", room);
        }
    }

    fn subscriber_count(&self, room: RoomId) -> usize {
        self.channels
            .lock()
            .get(&room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    fn cleanup_inactive(&self) -> usize {
        let mut channels = self.channels.lock();
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;
    use uuid::Uuid;

    fn event() -> SharedEvent {
        Arc::new(ServerEvent::GroupLeft {
            group_id: Uuid::new_v4(),
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_of_that_room_only() {
        let bus = LocalRoomBus::new(16);
        let room = RoomId::Group(Uuid::new_v4());
        let other = RoomId::Group(Uuid::new_v4());
        let mut rx = bus.subscribe(room);
        let mut other_rx = bus.subscribe(other);

        let sent = event();
        assert_eq!(bus.publish(room, sent.clone()), 1);

        assert!(Arc::ptr_eq(&rx.recv().await.unwrap(), &sent));
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = LocalRoomBus::new(16);
        assert_eq!(bus.publish(RoomId::User(Uuid::new_v4()), event()), 0);
        assert_eq!(bus.room_count(), 0);
    }

    #[tokio::test]
    async fn test_close_room_ends_subscriptions() {
        let bus = LocalRoomBus::new(16);
        let room = RoomId::Group(Uuid::new_v4());
        let mut rx = bus.subscribe(room);
        bus.publish(room, event());
        bus.close_room(room);

        assert!(rx.recv().await.is_ok());
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[test]
    fn test_cleanup_inactive_channels() {
        let bus = LocalRoomBus::new(16);
        let kept = RoomId::User(Uuid::new_v4());
        let _rx = bus.subscribe(kept);
        drop(bus.subscribe(RoomId::User(Uuid::new_v4())));

        assert_eq!(bus.cleanup_inactive(), 1);
        assert_eq!(bus.subscriber_count(kept), 1);
        assert_eq!(bus.room_count(), 1);
    }
}
