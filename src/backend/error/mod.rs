//! Backend Error Module
//!
//! - **`types`** - `GatewayError` and its mapping to status codes and kinds
//! - **`conversion`** - `IntoResponse` and socket error frames
//!
//! Handlers and gateway operations return `Result<T, GatewayError>`; store
//! errors convert with `?`, keeping conflicts and dangling references as
//! domain errors and everything else as `Internal`.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::GatewayError;
