//! Groups Module
//!
//! HTTP surface for group management. The rules live in the message router
//! and the membership resolver; these handlers only extract and render.

pub mod handlers;

pub use handlers::{
    create_group, delete_group, get_group, list_group_members, list_group_messages,
    list_groups, list_my_groups,
};
