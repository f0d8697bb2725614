//! Durable Store
//!
//! Persistence boundary of the gateway. Everything the router and the room
//! resolver read or write goes through the [`Store`] trait, so the core can
//! run against Postgres in production and against [`MemoryStore`] in tests
//! or when no `DATABASE_URL` is configured.
//!
//! # Constraints every implementation enforces
//!
//! - `(user_id, group_id)` is unique in memberships: a duplicate insert
//!   fails with [`StoreError::Conflict`].
//! - Rows referencing a missing user or group fail with
//!   [`StoreError::MissingReference`].
//! - Deleting a group removes its memberships and messages.
//! - A direct message's `read` flag only moves from `false` to `true`, and
//!   [`Store::mark_direct_message_read`] reports whether this call was the
//!   one that moved it.
//!
//! # Bounded calls
//!
//! [`BoundedStore`] wraps any store and fails a call with
//! [`StoreError::Timeout`] once the configured deadline passes. It never
//! retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::messaging::{
    DirectMessage, Group, GroupMember, GroupMemberView, GroupMessage, GroupMessageView, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle used throughout the backend
pub type SharedStore = Arc<dyn Store>;

/// Persistence failures, kept distinct from domain errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// The write referenced a row that does not exist
    #[error("referenced row does not exist: {0}")]
    MissingReference(String),

    /// The call did not finish before its deadline
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return StoreError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference(constraint);
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    // Users

    async fn create_user(&self, user: &User) -> Result<User, StoreError>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    // Direct messages

    async fn insert_direct_message(
        &self,
        message: &DirectMessage,
    ) -> Result<DirectMessage, StoreError>;

    async fn get_direct_message(&self, message_id: Uuid)
        -> Result<Option<DirectMessage>, StoreError>;

    /// Set `read = true` if it is still false.
    ///
    /// Returns the updated row only when this call performed the transition.
    async fn mark_direct_message_read(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError>;

    /// Users `user_id` has exchanged messages with, most recent first
    async fn list_conversation_partners(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn latest_direct_message(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError>;

    /// Unread messages sent by `sender_id` to `receiver_id`
    async fn count_unread(&self, receiver_id: Uuid, sender_id: Uuid) -> Result<u64, StoreError>;

    /// Both directions of a conversation, oldest first
    async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError>;

    /// Bulk read-marking of everything `sender_id` sent to `receiver_id`
    async fn mark_conversation_read(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<u64, StoreError>;

    // Groups

    /// Insert the group and the creator's admin membership atomically
    async fn create_group(
        &self,
        group: &Group,
        creator_id: Uuid,
    ) -> Result<(Group, GroupMember), StoreError>;

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError>;

    /// All groups, newest first
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Groups `user_id` is a member of, newest first
    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError>;

    /// Delete a group with its memberships and messages
    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError>;

    // Memberships

    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Option<GroupMember>, StoreError>;

    async fn list_memberships_for_user(&self, user_id: Uuid)
        -> Result<Vec<GroupMember>, StoreError>;

    async fn insert_membership(&self, member: &GroupMember) -> Result<GroupMember, StoreError>;

    async fn delete_membership(&self, user_id: Uuid, group_id: Uuid) -> Result<bool, StoreError>;

    /// Members with their profiles, in join order
    async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMemberView>, StoreError>;

    // Group messages

    async fn insert_group_message(
        &self,
        message: &GroupMessage,
    ) -> Result<GroupMessage, StoreError>;

    /// Messages with sender info, oldest first
    async fn list_group_messages(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMessageView>, StoreError>;
}

/// Store decorator that bounds every call with a timeout
pub struct BoundedStore {
    inner: SharedStore,
    timeout: Duration,
}

impl BoundedStore {
    pub fn new(inner: SharedStore, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        T: Send,
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("[Store] Call exceeded {:?}", self.timeout);
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl Store for BoundedStore {
    async fn create_user(&self, user: &User) -> Result<User, StoreError> {
        self.bounded(self.inner.create_user(user)).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        self.bounded(self.inner.get_user(user_id)).await
    }

    async fn insert_direct_message(
        &self,
        message: &DirectMessage,
    ) -> Result<DirectMessage, StoreError> {
        self.bounded(self.inner.insert_direct_message(message)).await
    }

    async fn get_direct_message(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        self.bounded(self.inner.get_direct_message(message_id)).await
    }

    async fn mark_direct_message_read(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        self.bounded(self.inner.mark_direct_message_read(message_id))
            .await
    }

    async fn list_conversation_partners(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.bounded(self.inner.list_conversation_partners(user_id))
            .await
    }

    async fn latest_direct_message(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        self.bounded(self.inner.latest_direct_message(user_id, other_user_id))
            .await
    }

    async fn count_unread(&self, receiver_id: Uuid, sender_id: Uuid) -> Result<u64, StoreError> {
        self.bounded(self.inner.count_unread(receiver_id, sender_id))
            .await
    }

    async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError> {
        self.bounded(self.inner.list_direct_messages(user_id, other_user_id))
            .await
    }

    async fn mark_conversation_read(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.bounded(self.inner.mark_conversation_read(receiver_id, sender_id))
            .await
    }

    async fn create_group(
        &self,
        group: &Group,
        creator_id: Uuid,
    ) -> Result<(Group, GroupMember), StoreError> {
        self.bounded(self.inner.create_group(group, creator_id)).await
    }

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        self.bounded(self.inner.get_group(group_id)).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        self.bounded(self.inner.list_groups()).await
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError> {
        self.bounded(self.inner.list_groups_for_user(user_id)).await
    }

    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.delete_group(group_id)).await
    }

    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Option<GroupMember>, StoreError> {
        self.bounded(self.inner.get_membership(user_id, group_id))
            .await
    }

    async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<GroupMember>, StoreError> {
        self.bounded(self.inner.list_memberships_for_user(user_id))
            .await
    }

    async fn insert_membership(&self, member: &GroupMember) -> Result<GroupMember, StoreError> {
        self.bounded(self.inner.insert_membership(member)).await
    }

    async fn delete_membership(&self, user_id: Uuid, group_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.delete_membership(user_id, group_id))
            .await
    }

    async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMemberView>, StoreError> {
        self.bounded(self.inner.list_members(group_id)).await
    }

    async fn insert_group_message(
        &self,
        message: &GroupMessage,
    ) -> Result<GroupMessage, StoreError> {
        self.bounded(self.inner.insert_group_message(message)).await
    }

    async fn list_group_messages(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMessageView>, StoreError> {
        self.bounded(self.inner.list_group_messages(group_id)).await
    }
}
