/**
 * Live Messaging Gateway
 *
 * Entry point for everything a live connection does: admission, inbound
 * intents and eviction. The transport (`socket.rs`) only moves frames;
 * every rule lives behind these three calls.
 *
 * # Admission
 *
 * 1. The credential has already been verified (no identity, no entry).
 * 2. The connection is indexed in the registry.
 * 3. The resolver subscribes it to `user:{id}` and to each group room.
 *
 * # Dispatch
 *
 * The sender is resolved from the registry, never from the payload. The
 * intent goes to the router or the resolver and the result comes back as
 * the acknowledgement for the originating connection.
 */

use std::sync::Arc;

use uuid::Uuid;

use super::bus::RoomBus;
use super::connection::{ConnectionHandle, ConnectionInbox};
use super::emitter::FanOutEmitter;
use super::locks::KeyedLocks;
use super::registry::ConnectionRegistry;
use super::rooms::{RoomId, RoomMembershipResolver};
use crate::backend::auth::Identity;
use crate::backend::error::GatewayError;
use crate::backend::messaging::router::MessageRouter;
use crate::backend::store::SharedStore;
use crate::shared::{ClientIntent, ServerEvent};

pub struct Gateway {
    store: SharedStore,
    bus: Arc<dyn RoomBus>,
    registry: Arc<ConnectionRegistry>,
    resolver: Arc<RoomMembershipResolver>,
    router: MessageRouter,
}

impl Gateway {
    pub fn new(store: SharedStore, bus: Arc<dyn RoomBus>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let locks = Arc::new(KeyedLocks::new());
        let resolver = Arc::new(RoomMembershipResolver::new(
            store.clone(),
            registry.clone(),
            bus.clone(),
            locks.clone(),
        ));
        let router = MessageRouter::new(
            store.clone(),
            FanOutEmitter::new(bus.clone()),
            resolver.clone(),
            locks,
        );
        Self {
            store,
            bus,
            registry,
            resolver,
            router,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn bus(&self) -> &Arc<dyn RoomBus> {
        &self.bus
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Create and admit a connection in one step
    pub async fn connect(
        &self,
        identity: Identity,
    ) -> Result<(ConnectionHandle, ConnectionInbox, Vec<RoomId>), GatewayError> {
        let (handle, inbox) = ConnectionHandle::new(identity.user_id);
        let rooms = self.admit(&handle, Some(identity)).await?;
        Ok((handle, inbox, rooms))
    }

    /// Admit a connection; rejected unless it carries a verified identity
    /// matching the handle.
    pub async fn admit(
        &self,
        handle: &ConnectionHandle,
        identity: Option<Identity>,
    ) -> Result<Vec<RoomId>, GatewayError> {
        let identity = identity.ok_or_else(|| GatewayError::unauthorized("Missing credential"))?;
        if identity.user_id != handle.user_id() {
            return Err(GatewayError::unauthorized("Identity does not match connection"));
        }

        self.registry.admit(handle);
        match self.resolver.resolve_and_subscribe(handle).await {
            Ok(rooms) => {
                tracing::info!(
                    "[Gateway] Admitted connection {} for user {} ({} connections online)",
                    handle.id(),
                    identity.user_id,
                    self.registry.connection_count()
                );
                Ok(rooms)
            }
            Err(err) => {
                self.registry.evict(handle.id());
                Err(err)
            }
        }
    }

    /// Forget a connection. Its subscriptions end with its inbox.
    pub fn evict(&self, handle: &ConnectionHandle) {
        if let Some(user_id) = self.registry.evict(handle.id()) {
            tracing::info!("[Gateway] Evicted connection {} of user {}", handle.id(), user_id);
        }
    }

    /// Execute one inbound intent and return the acknowledgement
    pub async fn dispatch(
        &self,
        handle: &ConnectionHandle,
        intent: ClientIntent,
    ) -> Result<ServerEvent, GatewayError> {
        let user_id = self
            .registry
            .user_for(handle.id())
            .ok_or_else(|| GatewayError::unauthorized("Connection is not admitted"))?;
        intent.validate()?;

        tracing::debug!("[Gateway] {} from user {}", intent.name(), user_id);
        self.execute(user_id, intent).await
    }

    async fn execute(&self, user_id: Uuid, intent: ClientIntent) -> Result<ServerEvent, GatewayError> {
        match intent {
            ClientIntent::SendDirectMessage {
                content,
                receiver_id,
            } => self
                .router
                .send_direct_message(user_id, receiver_id, content)
                .await
                .map(ServerEvent::MessageSent),
            ClientIntent::MarkRead { message_id } => self
                .router
                .mark_read(user_id, message_id)
                .await
                .map(ServerEvent::MessageMarkedAsRead),
            ClientIntent::JoinGroup { group_id } => {
                self.resolver.join_group(user_id, group_id).await?;
                Ok(ServerEvent::GroupJoined { group_id })
            }
            ClientIntent::LeaveGroup { group_id } => {
                self.resolver.leave_group(user_id, group_id).await?;
                Ok(ServerEvent::GroupLeft { group_id })
            }
            ClientIntent::SendGroupMessage { content, group_id } => self
                .router
                .send_group_message(user_id, group_id, content)
                .await
                .map(ServerEvent::GroupMessageSent),
        }
    }
}
