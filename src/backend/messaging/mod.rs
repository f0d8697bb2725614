//! Messaging Module
//!
//! - **`router`** - the message router: validate, persist, publish
//! - **`handlers`** - HTTP queries over conversations

pub mod handlers;
pub mod router;

pub use handlers::{get_conversation, get_conversations};
pub use router::MessageRouter;
