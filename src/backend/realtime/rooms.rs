/**
 * Room Membership Resolver
 *
 * Maps users to rooms and keeps live subscriptions in step with stored
 * memberships.
 *
 * # Rooms
 *
 * - `user:{id}` - personal inbox, every connection of the user
 * - `group:{id}` - one per group, every connection of every member
 *
 * # Ordering
 *
 * Admission, join and leave for a user hold that user's room lock plus the
 * locks of the groups involved, so a connection being admitted can never
 * miss, or wrongly keep, a membership changed at the same time. User locks
 * always come before group locks, which is also the `RoomId` order.
 */

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::bus::RoomBus;
use super::connection::ConnectionHandle;
use super::emitter::FanOutEmitter;
use super::locks::KeyedLocks;
use super::registry::ConnectionRegistry;
use crate::backend::error::GatewayError;
use crate::backend::store::{SharedStore, StoreError};
use crate::shared::messaging::GroupMember;
use crate::shared::ServerEvent;

/// A fan-out target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomId {
    User(Uuid),
    Group(Uuid),
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::User(id) => write!(f, "user:{}", id),
            RoomId::Group(id) => write!(f, "group:{}", id),
        }
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub struct RoomMembershipResolver {
    store: SharedStore,
    registry: Arc<ConnectionRegistry>,
    bus: Arc<dyn RoomBus>,
    emitter: FanOutEmitter,
    locks: Arc<KeyedLocks<RoomId>>,
}

impl RoomMembershipResolver {
    pub fn new(
        store: SharedStore,
        registry: Arc<ConnectionRegistry>,
        bus: Arc<dyn RoomBus>,
        locks: Arc<KeyedLocks<RoomId>>,
    ) -> Self {
        let emitter = FanOutEmitter::new(bus.clone());
        Self {
            store,
            registry,
            bus,
            emitter,
            locks,
        }
    }

    fn subscribe_handle(&self, handle: &ConnectionHandle, room: RoomId) {
        if !handle.subscribe(room, self.bus.subscribe(room)) {
            tracing::debug!("[Realtime] Connection {} closed before joining {}", handle.id(), room);
        }
    }

    /// Subscribe a freshly admitted connection to its inbox and groups
    pub async fn resolve_and_subscribe(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<Vec<RoomId>, GatewayError> {
        let user_id = handle.user_id();
        let _guard = self.locks.lock(RoomId::User(user_id)).await;

        let memberships = self.store.list_memberships_for_user(user_id).await?;
        let _group_guard = self
            .locks
            .lock_many(memberships.iter().map(|m| RoomId::Group(m.group_id)))
            .await;

        let mut rooms = Vec::with_capacity(memberships.len() + 1);
        rooms.push(RoomId::User(user_id));
        for membership in &memberships {
            // the group may have been deleted before its lock was ours
            if self.store.get_membership(user_id, membership.group_id).await?.is_some() {
                rooms.push(RoomId::Group(membership.group_id));
            }
        }

        for room in &rooms {
            self.subscribe_handle(handle, *room);
        }

        tracing::info!(
            "[Realtime] Connection {} of user {} subscribed to {} rooms",
            handle.id(),
            user_id,
            rooms.len()
        );
        Ok(rooms)
    }

    /// Subscribe every live connection of `user_id` to `room`
    pub fn subscribe_user(&self, user_id: Uuid, room: RoomId) -> usize {
        let connections = self.registry.connections_for(user_id);
        for handle in &connections {
            self.subscribe_handle(handle, room);
        }
        connections.len()
    }

    pub async fn join_group(&self, user_id: Uuid, group_id: Uuid) -> Result<GroupMember, GatewayError> {
        let room = RoomId::Group(group_id);
        let _guard = self.locks.lock_many([RoomId::User(user_id), room]).await;

        if self.store.get_group(group_id).await?.is_none() {
            return Err(GatewayError::not_found("Group not found"));
        }
        if self.store.get_membership(user_id, group_id).await?.is_some() {
            return Err(GatewayError::conflict("Already a member of this group"));
        }

        let member = self
            .store
            .insert_membership(&GroupMember::new(user_id, group_id, false))
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => GatewayError::conflict("Already a member of this group"),
                other => other.into(),
            })?;

        self.subscribe_user(user_id, room);
        self.emitter.publish(
            room,
            ServerEvent::UserJoinedGroup {
                user_id,
                group_id,
                joined_at: member.joined_at,
            },
        );

        tracing::info!("[Realtime] User {} joined group {}", user_id, group_id);
        Ok(member)
    }

    pub async fn leave_group(&self, user_id: Uuid, group_id: Uuid) -> Result<(), GatewayError> {
        let room = RoomId::Group(group_id);
        let _guard = self.locks.lock_many([RoomId::User(user_id), room]).await;

        if !self.store.delete_membership(user_id, group_id).await? {
            return Err(GatewayError::forbidden("Not a member of this group"));
        }

        // The leaver still sees its own departure, then nothing more
        let event = Arc::new(ServerEvent::UserLeftGroup { user_id, group_id });
        self.emitter.publish_shared(room, event.clone());
        for handle in self.registry.connections_for(user_id) {
            handle.unsubscribe(room, Some(event.clone()));
        }

        tracing::info!("[Realtime] User {} left group {}", user_id, group_id);
        Ok(())
    }

    /// End every subscription to a room
    pub fn close_room(&self, room: RoomId) {
        self.bus.close_room(room);
    }
}
