//! Shared Module
//!
//! Types that cross the process boundary: the socket wire format, the data
//! model returned by the query API, payload validation errors and the
//! application configuration. Nothing here depends on the server runtime.

/// Socket frame types
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Users, direct messages and groups
pub mod messaging;

pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{ClientIntent, ServerEvent};
