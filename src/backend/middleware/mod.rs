//! Middleware Module
//!
//! - **`auth`** - bearer authentication for the `/api` routes

pub mod auth;

pub use auth::{auth_middleware, extract_authenticated_user, AuthUser, AuthenticatedUser};
