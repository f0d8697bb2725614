//! chatgate - Real-time Chat Gateway
//!
//! The live-messaging core of a chat backend. Authenticated WebSocket
//! connections are indexed by user, subscribed to their personal inbox room
//! and to one room per group they belong to, and every accepted write is
//! persisted before it is fanned out to exactly the connections subscribed
//! to the affected rooms.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire and data types usable without the server runtime
//!   - Socket frames (`ClientIntent`, `ServerEvent`)
//!   - Users, direct messages, groups
//!   - Configuration and payload errors
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Connection registry, room resolver, message router, fan-out emitter
//!   - Durable store trait with Postgres and in-memory implementations
//!   - JWT identity verification
//!   - Axum WebSocket endpoint and JSON query API
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables `backend` and its server dependencies
//!
//! # Usage
//!
//! ```rust,no_run
//! use chatgate::backend::server::init::create_app;
//! use chatgate::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let app = create_app(config).await?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
