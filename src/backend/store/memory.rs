//! In-memory store
//!
//! A [`Store`] backed by plain collections behind one `parking_lot` lock.
//! It enforces the same constraints as the Postgres schema: unique emails,
//! unique memberships, existing references, cascading group deletes. Each
//! trait call takes the lock once, so every call is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::shared::messaging::{
    DirectMessage, Group, GroupMember, GroupMemberView, GroupMessage, GroupMessageView,
    SenderInfo, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    /// Insertion order doubles as the tie-breaking sequence
    direct_messages: Vec<DirectMessage>,
    groups: HashMap<Uuid, Group>,
    members: Vec<GroupMember>,
    group_messages: Vec<GroupMessage>,
}

impl Tables {
    fn require_user(&self, user_id: Uuid) -> Result<&User, StoreError> {
        self.users
            .get(&user_id)
            .ok_or_else(|| StoreError::MissingReference(format!("users({user_id})")))
    }

    fn require_group(&self, group_id: Uuid) -> Result<&Group, StoreError> {
        self.groups
            .get(&group_id)
            .ok_or_else(|| StoreError::MissingReference(format!("chat_groups({group_id})")))
    }

    fn conversation(&self, a: Uuid, b: Uuid) -> Vec<DirectMessage> {
        let mut messages: Vec<DirectMessage> = self
            .direct_messages
            .iter()
            .filter(|m| m.is_between(a, b))
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        messages.sort_by_key(|m| m.created_at);
        messages
    }
}

/// Volatile store for tests and database-less runs
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict("users_pkey".into()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().users.get(&user_id).cloned())
    }

    async fn insert_direct_message(
        &self,
        message: &DirectMessage,
    ) -> Result<DirectMessage, StoreError> {
        let mut tables = self.tables.write();
        tables.require_user(message.sender_id)?;
        tables.require_user(message.receiver_id)?;
        tables.direct_messages.push(message.clone());
        Ok(message.clone())
    }

    async fn get_direct_message(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        Ok(self
            .tables
            .read()
            .direct_messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn mark_direct_message_read(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        let mut tables = self.tables.write();
        let updated = tables
            .direct_messages
            .iter_mut()
            .find(|m| m.id == message_id && !m.read)
            .map(|m| {
                m.read = true;
                m.clone()
            });
        Ok(updated)
    }

    async fn list_conversation_partners(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read();
        let mut partners: Vec<Uuid> = Vec::new();
        // newest message first, first sighting wins
        let mut ordered: Vec<&DirectMessage> = tables
            .direct_messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
            .collect();
        ordered.sort_by_key(|m| m.created_at);
        for message in ordered.into_iter().rev() {
            let partner = message.counterpart_of(user_id);
            if !partners.contains(&partner) {
                partners.push(partner);
            }
        }
        Ok(partners)
    }

    async fn latest_direct_message(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        Ok(self.tables.read().conversation(user_id, other_user_id).pop())
    }

    async fn count_unread(&self, receiver_id: Uuid, sender_id: Uuid) -> Result<u64, StoreError> {
        let count = self
            .tables
            .read()
            .direct_messages
            .iter()
            .filter(|m| m.receiver_id == receiver_id && m.sender_id == sender_id && !m.read)
            .count();
        Ok(count as u64)
    }

    async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError> {
        Ok(self.tables.read().conversation(user_id, other_user_id))
    }

    async fn mark_conversation_read(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let mut changed = 0;
        for message in tables.direct_messages.iter_mut() {
            if message.receiver_id == receiver_id && message.sender_id == sender_id && !message.read
            {
                message.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn create_group(
        &self,
        group: &Group,
        creator_id: Uuid,
    ) -> Result<(Group, GroupMember), StoreError> {
        let mut tables = self.tables.write();
        tables.require_user(creator_id)?;
        if tables.groups.contains_key(&group.id) {
            return Err(StoreError::Conflict("chat_groups_pkey".into()));
        }
        let admin = GroupMember::new(creator_id, group.id, true);
        tables.groups.insert(group.id, group.clone());
        tables.members.push(admin.clone());
        Ok((group.clone(), admin))
    }

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.tables.read().groups.get(&group_id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let mut groups: Vec<Group> = self.tables.read().groups.values().cloned().collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError> {
        let tables = self.tables.read();
        let mut groups: Vec<Group> = tables
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.groups.get(&m.group_id).cloned())
            .collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        if tables.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        tables.members.retain(|m| m.group_id != group_id);
        tables.group_messages.retain(|m| m.group_id != group_id);
        Ok(true)
    }

    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Option<GroupMember>, StoreError> {
        Ok(self
            .tables
            .read()
            .members
            .iter()
            .find(|m| m.user_id == user_id && m.group_id == group_id)
            .cloned())
    }

    async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<GroupMember>, StoreError> {
        Ok(self
            .tables
            .read()
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_membership(&self, member: &GroupMember) -> Result<GroupMember, StoreError> {
        let mut tables = self.tables.write();
        tables.require_user(member.user_id)?;
        tables.require_group(member.group_id)?;
        if tables
            .members
            .iter()
            .any(|m| m.user_id == member.user_id && m.group_id == member.group_id)
        {
            return Err(StoreError::Conflict("group_members_user_id_group_id_key".into()));
        }
        tables.members.push(member.clone());
        Ok(member.clone())
    }

    async fn delete_membership(&self, user_id: Uuid, group_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let before = tables.members.len();
        tables
            .members
            .retain(|m| !(m.user_id == user_id && m.group_id == group_id));
        Ok(tables.members.len() != before)
    }

    async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMemberView>, StoreError> {
        let tables = self.tables.read();
        let mut members: Vec<GroupMemberView> = tables
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|user| GroupMemberView {
                    id: m.id,
                    user_id: m.user_id,
                    is_admin: m.is_admin,
                    joined_at: m.joined_at,
                    user: user.profile(),
                })
            })
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn insert_group_message(
        &self,
        message: &GroupMessage,
    ) -> Result<GroupMessage, StoreError> {
        let mut tables = self.tables.write();
        tables.require_user(message.user_id)?;
        tables.require_group(message.group_id)?;
        tables.group_messages.push(message.clone());
        Ok(message.clone())
    }

    async fn list_group_messages(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMessageView>, StoreError> {
        let tables = self.tables.read();
        let mut messages: Vec<GroupMessageView> = tables
            .group_messages
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|user| GroupMessageView {
                    message: m.clone(),
                    user: SenderInfo::from(user),
                })
            })
            .collect();
        messages.sort_by_key(|m| m.message.created_at);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn seeded() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let alice = store.create_user(&User::new("alice@example.com", "Alice")).await.unwrap();
        let bob = store.create_user(&User::new("bob@example.com", "Bob")).await.unwrap();
        (store, alice, bob)
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (store, _, _) = seeded().await;
        let result = store.create_user(&User::new("alice@example.com", "Other")).await;
        assert_matches!(result, Err(StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_message_to_unknown_user_is_missing_reference() {
        let (store, alice, _) = seeded().await;
        let result = store
            .insert_direct_message(&DirectMessage::new(alice.id, Uuid::new_v4(), "hi"))
            .await;
        assert_matches!(result, Err(StoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn test_mark_read_transitions_once() {
        let (store, alice, bob) = seeded().await;
        let msg = store
            .insert_direct_message(&DirectMessage::new(alice.id, bob.id, "hi"))
            .await
            .unwrap();

        let first = store.mark_direct_message_read(msg.id).await.unwrap();
        let second = store.mark_direct_message_read(msg.id).await.unwrap();

        assert!(first.map(|m| m.read).unwrap_or(false));
        assert_eq!(second, None);
        assert!(store.get_direct_message(msg.id).await.unwrap().unwrap().read);
    }

    #[tokio::test]
    async fn test_conversation_queries() {
        let (store, alice, bob) = seeded().await;
        for text in ["one", "two", "three"] {
            store
                .insert_direct_message(&DirectMessage::new(bob.id, alice.id, text))
                .await
                .unwrap();
        }
        store
            .insert_direct_message(&DirectMessage::new(alice.id, bob.id, "reply"))
            .await
            .unwrap();

        let history = store.list_direct_messages(alice.id, bob.id).await.unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three", "reply"]);

        assert_eq!(store.count_unread(alice.id, bob.id).await.unwrap(), 3);
        assert_eq!(store.list_conversation_partners(alice.id).await.unwrap(), vec![bob.id]);
        assert_eq!(
            store.latest_direct_message(bob.id, alice.id).await.unwrap().unwrap().content,
            "reply"
        );

        assert_eq!(store.mark_conversation_read(alice.id, bob.id).await.unwrap(), 3);
        assert_eq!(store.count_unread(alice.id, bob.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_membership_uniqueness_and_cascade() {
        let (store, alice, bob) = seeded().await;
        let (group, admin) = store
            .create_group(&Group::new("rust", None), alice.id)
            .await
            .unwrap();
        assert!(admin.is_admin);

        store
            .insert_membership(&GroupMember::new(bob.id, group.id, false))
            .await
            .unwrap();
        let duplicate = store
            .insert_membership(&GroupMember::new(bob.id, group.id, false))
            .await;
        assert_matches!(duplicate, Err(StoreError::Conflict(_)));

        store
            .insert_group_message(&GroupMessage::new(bob.id, group.id, "hey"))
            .await
            .unwrap();
        assert_eq!(store.list_members(group.id).await.unwrap().len(), 2);

        assert!(store.delete_group(group.id).await.unwrap());
        assert!(store.list_members(group.id).await.unwrap().is_empty());
        assert!(store.list_group_messages(group.id).await.unwrap().is_empty());
        assert!(store.list_memberships_for_user(bob.id).await.unwrap().is_empty());
        assert!(!store.delete_group(group.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_membership_requires_existing_group() {
        let (store, alice, _) = seeded().await;
        let result = store
            .insert_membership(&GroupMember::new(alice.id, Uuid::new_v4(), false))
            .await;
        assert_matches!(result, Err(StoreError::MissingReference(_)));
    }
}
