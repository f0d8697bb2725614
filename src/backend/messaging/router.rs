/**
 * Message Router
 *
 * Validates, persists and publishes every write of the chat core, and
 * serves the read-side queries over the same store.
 *
 * # Write path
 *
 * 1. Validate the payload and the caller's rights.
 * 2. Take the room locks the write will publish to.
 * 3. Persist.
 * 4. Publish while still holding the locks, so subscribers of a room see
 *    events in the order the store committed them.
 *
 * A failure at any step returns an error before anything is published;
 * nothing is fanned out for a write that did not commit.
 */

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::error::GatewayError;
use crate::backend::realtime::emitter::FanOutEmitter;
use crate::backend::realtime::locks::KeyedLocks;
use crate::backend::realtime::rooms::{RoomId, RoomMembershipResolver};
use crate::backend::store::SharedStore;
use crate::shared::messaging::{
    validate_content, ConversationSummary, CreateGroupRequest, DirectMessage, Group,
    GroupMemberView, GroupMessage, GroupMessageView, SenderInfo,
};
use crate::shared::ServerEvent;

pub struct MessageRouter {
    store: SharedStore,
    emitter: FanOutEmitter,
    resolver: Arc<RoomMembershipResolver>,
    locks: Arc<KeyedLocks<RoomId>>,
}

impl MessageRouter {
    pub fn new(
        store: SharedStore,
        emitter: FanOutEmitter,
        resolver: Arc<RoomMembershipResolver>,
        locks: Arc<KeyedLocks<RoomId>>,
    ) -> Self {
        Self {
            store,
            emitter,
            resolver,
            locks,
        }
    }

    /// Persist a direct message and deliver it to both inboxes
    pub async fn send_direct_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<DirectMessage, GatewayError> {
        validate_content(&content)?;
        if self.store.get_user(receiver_id).await?.is_none() {
            return Err(GatewayError::not_found("Receiver not found"));
        }

        let rooms = [RoomId::User(sender_id), RoomId::User(receiver_id)];
        let _guard = self.locks.lock_many(rooms).await;

        let message = self
            .store
            .insert_direct_message(&DirectMessage::new(sender_id, receiver_id, content))
            .await?;
        self.emitter
            .publish_all(&rooms, ServerEvent::MessageReceived(message.clone()));

        tracing::debug!("[Router] Direct message {} from {} to {}", message.id, sender_id, receiver_id);
        Ok(message)
    }

    /// Mark a received message read.
    ///
    /// Idempotent: the store only writes when the flag flips, but every
    /// call publishes `messageUpdated` so the sender learns of reads that
    /// happened through a conversation fetch.
    pub async fn mark_read(
        &self,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<DirectMessage, GatewayError> {
        let message = self
            .store
            .get_direct_message(message_id)
            .await?
            .filter(|m| m.receiver_id == user_id)
            .ok_or_else(|| GatewayError::not_found("Message not found"))?;

        let rooms = [RoomId::User(message.receiver_id), RoomId::User(message.sender_id)];
        let _guard = self.locks.lock_many(rooms).await;

        let updated = match self.store.mark_direct_message_read(message_id).await? {
            Some(updated) => updated,
            None => DirectMessage {
                read: true,
                ..message
            },
        };
        self.emitter
            .publish_all(&rooms, ServerEvent::MessageUpdated(updated.clone()));
        Ok(updated)
    }

    /// Persist a group message and deliver it to the group room
    pub async fn send_group_message(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        content: String,
    ) -> Result<GroupMessageView, GatewayError> {
        validate_content(&content)?;
        let sender = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| GatewayError::unauthorized("Unknown user"))?;

        let room = RoomId::Group(group_id);
        let _guard = self.locks.lock(room).await;

        // checked under the room lock so a concurrent leave cannot slip in
        if self.store.get_membership(user_id, group_id).await?.is_none() {
            return Err(GatewayError::forbidden("Not a member of this group"));
        }

        let message = self
            .store
            .insert_group_message(&GroupMessage::new(user_id, group_id, content))
            .await?;
        let view = GroupMessageView {
            message,
            user: SenderInfo::from(&sender),
        };
        self.emitter
            .publish(room, ServerEvent::GroupMessageReceived(view.clone()));

        Ok(view)
    }

    /// Counterparts with their latest message and unread count
    pub async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, GatewayError> {
        let partners = self.store.list_conversation_partners(user_id).await?;

        let mut conversations = Vec::with_capacity(partners.len());
        for partner_id in partners {
            let Some(partner) = self.store.get_user(partner_id).await? else {
                continue;
            };
            let latest_message = self.store.latest_direct_message(user_id, partner_id).await?;
            let unread_count = self.store.count_unread(user_id, partner_id).await?;
            conversations.push(ConversationSummary {
                user: partner.profile(),
                latest_message,
                unread_count,
            });
        }
        Ok(conversations)
    }

    /// Full conversation, oldest first.
    ///
    /// Marks the counterpart's messages read in one bulk update, without
    /// publishing `messageUpdated`. The returned messages are as they were
    /// before the update.
    pub async fn list_conversation(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Vec<DirectMessage>, GatewayError> {
        if self.store.get_user(other_user_id).await?.is_none() {
            return Err(GatewayError::not_found(format!(
                "User with ID {} not found",
                other_user_id
            )));
        }

        let messages = self.store.list_direct_messages(user_id, other_user_id).await?;
        let marked = self.store.mark_conversation_read(user_id, other_user_id).await?;
        if marked > 0 {
            tracing::debug!("[Router] Marked {} messages from {} read for {}", marked, other_user_id, user_id);
        }
        Ok(messages)
    }

    pub async fn list_group_messages(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<GroupMessageView>, GatewayError> {
        self.require_group(group_id).await?;
        if self.store.get_membership(user_id, group_id).await?.is_none() {
            return Err(GatewayError::forbidden("Not a member of this group"));
        }
        Ok(self.store.list_group_messages(group_id).await?)
    }

    /// Create a group with the caller as its admin.
    ///
    /// The caller's live connections join the new room right away.
    pub async fn create_group(
        &self,
        user_id: Uuid,
        request: CreateGroupRequest,
    ) -> Result<Group, GatewayError> {
        request.validate()?;
        let group = Group::new(request.name.trim(), request.description);

        let _guard = self.locks.lock(RoomId::User(user_id)).await;
        let (group, _admin) = self.store.create_group(&group, user_id).await?;
        self.resolver.subscribe_user(user_id, RoomId::Group(group.id));

        tracing::info!("[Router] User {} created group {}", user_id, group.id);
        Ok(group)
    }

    /// Delete a group; only its admins may.
    ///
    /// Memberships and messages go with it and live subscriptions end.
    pub async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> Result<(), GatewayError> {
        self.require_group(group_id).await?;

        let room = RoomId::Group(group_id);
        let _guard = self.locks.lock(room).await;

        let is_admin = self
            .store
            .get_membership(user_id, group_id)
            .await?
            .map(|m| m.is_admin)
            .unwrap_or(false);
        if !is_admin {
            return Err(GatewayError::forbidden("Only group admins can delete the group"));
        }

        if !self.store.delete_group(group_id).await? {
            return Err(GatewayError::not_found("Group not found"));
        }
        self.resolver.close_room(room);

        tracing::info!("[Router] User {} deleted group {}", user_id, group_id);
        Ok(())
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, GatewayError> {
        Ok(self.store.list_groups().await?)
    }

    pub async fn list_my_groups(&self, user_id: Uuid) -> Result<Vec<Group>, GatewayError> {
        Ok(self.store.list_groups_for_user(user_id).await?)
    }

    pub async fn get_group(&self, group_id: Uuid) -> Result<Group, GatewayError> {
        self.require_group(group_id).await
    }

    pub async fn list_group_members(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMemberView>, GatewayError> {
        self.require_group(group_id).await?;
        Ok(self.store.list_members(group_id).await?)
    }

    async fn require_group(&self, group_id: Uuid) -> Result<Group, GatewayError> {
        self.store
            .get_group(group_id)
            .await?
            .ok_or_else(|| GatewayError::not_found("Group not found"))
    }
}
