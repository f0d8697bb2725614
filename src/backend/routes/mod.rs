//! Routes Module
//!
//! - **`router`** - assembles the full router
//! - **`api_routes`** - authenticated JSON API

/// Main router creation
pub mod router;

/// API endpoint routes
pub mod api_routes;

pub use router::create_router;
