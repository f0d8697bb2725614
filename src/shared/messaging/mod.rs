//! Messaging Module
//!
//! Data structures persisted by the store and carried on the wire:
//!
//! - `User` / `UserProfile` - accounts and their public projection
//! - `DirectMessage` - a one-to-one message
//! - `Group`, `GroupMember`, `GroupMessage` - group rooms
//! - `ConversationSummary` - conversation list entry
//!
//! All types serialize with camelCase field names.

pub mod conversation;
pub mod group;
pub mod message;
pub mod user;

pub use conversation::ConversationSummary;
pub use group::{
    CreateGroupRequest, DeleteGroupResponse, Group, GroupMember, GroupMemberView, GroupMessage,
    GroupMessageView,
};
pub use message::{validate_content, DirectMessage};
pub use user::{Role, SenderInfo, User, UserProfile};
