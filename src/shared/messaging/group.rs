//! Group Data Structures
//!
//! Groups, their memberships and their messages, plus the read-side views
//! returned by the query endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{SenderInfo, UserProfile};
use crate::shared::error::SharedError;

/// A named chat room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            created_at: Utc::now(),
        }
    }
}

/// Membership of a user in a group; `(user_id, group_id)` is unique
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

impl GroupMember {
    pub fn new(user_id: Uuid, group_id: Uuid, is_admin: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            is_admin,
            joined_at: Utc::now(),
        }
    }
}

/// An immutable message posted to a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl GroupMessage {
    pub fn new(user_id: Uuid, group_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            user_id,
            group_id,
            created_at: Utc::now(),
        }
    }
}

/// Group message decorated with its sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageView {
    #[serde(flatten)]
    pub message: GroupMessage,
    pub user: SenderInfo,
}

/// Membership decorated with the member's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Body of `POST /api/groups`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.name.trim().is_empty() {
            return Err(SharedError::validation("name", "must not be empty"));
        }
        Ok(())
    }
}

/// Body of `DELETE /api/groups/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteGroupResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_message_view_flattens_message() {
        let message = GroupMessage::new(Uuid::new_v4(), Uuid::new_v4(), "hello");
        let view = GroupMessageView {
            user: SenderInfo {
                id: message.user_id,
                display_name: "Ada".into(),
            },
            message: message.clone(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["content"], "hello");
        assert_eq!(json["groupId"], message.group_id.to_string());
        assert_eq!(json["user"]["displayName"], "Ada");
    }

    #[test]
    fn test_create_group_request_requires_name() {
        let ok: CreateGroupRequest = serde_json::from_str(r#"{"name":"rustaceans"}"#).unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.description, None);

        let blank = CreateGroupRequest {
            name: "  ".into(),
            description: None,
        };
        assert!(blank.validate().is_err());
    }
}
