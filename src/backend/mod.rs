//! Backend Module
//!
//! Server-side half of the chat gateway, compiled with the `ssr` feature.
//!
//! # Architecture
//!
//! - **`server`** - configuration, application state, `create_app`
//! - **`routes`** - router assembly
//! - **`realtime`** - WebSocket gateway, connection registry, room bus
//! - **`messaging`** - message router and conversation queries
//! - **`groups`** - group HTTP handlers
//! - **`store`** - durable store trait with PostgreSQL and in-memory backends
//! - **`auth`** - JWT sessions and the identity verifier
//! - **`middleware`** - bearer authentication for `/api`
//! - **`error`** - `GatewayError` and its HTTP/socket rendering
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs
//! ├── server/      - init, state, store loading
//! ├── routes/      - router, API routes
//! ├── realtime/    - gateway, registry, rooms, bus, socket
//! ├── messaging/   - router, handlers
//! ├── groups/      - handlers
//! ├── store/       - trait, postgres, memory
//! ├── auth/        - sessions, verifier
//! ├── middleware/  - auth
//! └── error/       - types, conversion
//! ```
//!
//! # Delivery guarantees
//!
//! A write is persisted before it is published, and publishes to a room
//! happen under that room's lock, so every subscriber of a room sees its
//! events in commit order. Delivery is at most once; clients recover
//! anything missed while offline through the HTTP queries.

/// Authentication
pub mod auth;

/// Backend error types
pub mod error;

/// Group management handlers
pub mod groups;

/// Message routing and conversation queries
pub mod messaging;

/// Request middleware
pub mod middleware;

/// Real-time gateway
pub mod realtime;

/// Route configuration
pub mod routes;

/// Server setup and configuration
pub mod server;

/// Durable store
pub mod store;

pub use error::GatewayError;
pub use realtime::Gateway;
pub use server::{create_app, AppState};
pub use store::{SharedStore, Store, StoreError};
