//! Conversation Summary
//!
//! One entry of the conversation list: the counterpart, the newest message
//! exchanged with them and how many of their messages are still unread.

use serde::{Deserialize, Serialize};

use super::message::DirectMessage;
use super::user::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user: UserProfile,
    pub latest_message: Option<DirectMessage>,
    pub unread_count: u64,
}
