//! Authentication Module
//!
//! - **`sessions`** - JWT claims, token creation and verification
//! - **`verifier`** - the `IdentityVerifier` seam and its JWT implementation
//!
//! Account flows (signup, login, password reset) belong to the account
//! service; this crate only verifies the tokens it issues.

pub mod sessions;
pub mod verifier;

pub use sessions::{create_token, verify_token, Claims};
pub use verifier::{extract_bearer, Identity, IdentityVerifier, JwtVerifier};
