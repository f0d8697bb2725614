//! Server Module
//!
//! - **`state`** - `AppState` and its `FromRef` projections
//! - **`config`** - store selection and database startup
//! - **`init`** - `create_app`, wiring everything into a router

/// Application state management
pub mod state;

/// Store loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::StartupError;
pub use init::create_app;
pub use state::AppState;
