//! Fan-out Emitter
//!
//! Publishes one event to one or more rooms. Delivery to each connection is
//! independent: the emitter never waits on a connection, so a slow or dead
//! subscriber cannot hold up the publishing request.

use std::sync::Arc;

use super::bus::{RoomBus, SharedEvent};
use super::rooms::RoomId;
use crate::shared::ServerEvent;

#[derive(Clone)]
pub struct FanOutEmitter {
    bus: Arc<dyn RoomBus>,
}

impl FanOutEmitter {
    pub fn new(bus: Arc<dyn RoomBus>) -> Self {
        Self { bus }
    }

    /// Publish to a single room
    ///
    /// # Returns
    ///
    /// Number of subscriptions the event was handed to (0 if none)
    pub fn publish(&self, room: RoomId, event: ServerEvent) -> usize {
        self.publish_shared(room, Arc::new(event))
    }

    /// Publish an already shared event, letting the caller keep a handle on it
    pub fn publish_shared(&self, room: RoomId, event: SharedEvent) -> usize {
        let name = event.event_name();
        let delivered = self.bus.publish(room, event);
        if delivered > 0 {
            tracing::info!("[Realtime] {} to {} broadcast to {} subscribers", name, room, delivered);
        } else {
            tracing::debug!("[Realtime] No subscribers in {} for {}", room, name);
        }
        delivered
    }

    /// Publish once to each distinct room in `rooms`
    pub fn publish_all(&self, rooms: &[RoomId], event: ServerEvent) -> usize {
        let event = Arc::new(event);
        let mut seen: Vec<RoomId> = Vec::with_capacity(rooms.len());
        let mut delivered = 0;
        for room in rooms {
            if seen.contains(room) {
                continue;
            }
            seen.push(*room);
            delivered += self.publish_shared(*room, event.clone());
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::realtime::bus::LocalRoomBus;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_all_deduplicates_rooms() {
        let bus = Arc::new(LocalRoomBus::new(8));
        let emitter = FanOutEmitter::new(bus.clone());
        let room = RoomId::User(Uuid::new_v4());
        let mut rx = bus.subscribe(room);

        let delivered = emitter.publish_all(
            &[room, room],
            ServerEvent::GroupJoined {
                group_id: Uuid::new_v4(),
            },
        );

        assert_eq!(delivered, 1);
        assert!(rx.recv().await.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_with_no_subscribers() {
        let emitter = FanOutEmitter::new(Arc::new(LocalRoomBus::new(8)));
        let count = emitter.publish(
            RoomId::Group(Uuid::new_v4()),
            ServerEvent::GroupLeft {
                group_id: Uuid::new_v4(),
            },
        );
        assert_eq!(count, 0);
    }
}
