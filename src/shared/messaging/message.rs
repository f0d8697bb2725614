//! Direct Message Data Structure
//!
//! A message between two users. The `read` flag only ever moves from
//! `false` to `true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// A persisted one-to-one message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl DirectMessage {
    /// Create a new unread message
    pub fn new(sender_id: Uuid, receiver_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender_id,
            receiver_id,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// The participant that is not `user_id`
    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }

    /// Whether the message belongs to the conversation between `a` and `b`
    pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// Reject message bodies that carry no visible text
pub fn validate_content(content: &str) -> Result<(), SharedError> {
    if content.trim().is_empty() {
        return Err(SharedError::validation("content", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_is_unread() {
        let msg = DirectMessage::new(Uuid::new_v4(), Uuid::new_v4(), "hi");
        assert!(!msg.read);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_counterpart_and_pair() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = DirectMessage::new(a, b, "hi");
        assert_eq!(msg.counterpart_of(a), b);
        assert_eq!(msg.counterpart_of(b), a);
        assert!(msg.is_between(b, a));
        assert!(!msg.is_between(a, Uuid::new_v4()));
    }

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hello").is_ok());
        assert!(validate_content("").is_err());
        assert!(validate_content("   \n").is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let msg = DirectMessage::new(Uuid::new_v4(), Uuid::new_v4(), "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("senderId").is_some());
        assert!(json.get("receiverId").is_some());
        assert_eq!(json["read"], false);
    }
}
