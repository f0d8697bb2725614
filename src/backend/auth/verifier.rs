//! Identity Verifier
//!
//! Turns a bearer credential into a verified identity. The gateway treats
//! the verifier as a black box behind [`IdentityVerifier`]; [`JwtVerifier`]
//! is the HS256 implementation used by the server.

use async_trait::async_trait;
use uuid::Uuid;

use super::sessions::verify_token;
use crate::backend::error::GatewayError;
use crate::shared::messaging::Role;

/// Who a connection or request acts as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verify a raw credential (the token, without any `Bearer` prefix)
    async fn verify(&self, credential: &str) -> Result<Identity, GatewayError>;
}

/// Verifies HS256 tokens signed with a shared secret
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, GatewayError> {
        let claims = verify_token(&self.secret, credential).map_err(|e| {
            tracing::warn!("[Auth] Invalid token: {:?}", e.kind());
            GatewayError::unauthorized("Invalid token")
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::warn!("[Auth] Token subject is not a user id: {}", claims.sub);
            GatewayError::unauthorized("Invalid token")
        })?;

        Ok(Identity {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Extract the token from a header-style value.
///
/// Accepts `Bearer <token>` (any casing of the scheme) as well as a bare
/// token. Returns `None` for empty values and for a scheme with no token.
pub fn extract_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => value,
    };
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::auth::sessions::create_token;
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("bearer   abc"), Some("abc"));
        assert_eq!(extract_bearer("abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("  bearer\t"), None);
        assert_eq!(extract_bearer("BEARER"), None);
        assert_eq!(extract_bearer(""), None);
        assert_eq!(extract_bearer("Basic dXNlcg=="), None);
    }

    #[tokio::test]
    async fn test_jwt_verifier_accepts_valid_token() {
        let user_id = Uuid::new_v4();
        let token = create_token("k", Duration::from_secs(60), user_id, "u@example.com", Role::User)
            .unwrap();

        let identity = JwtVerifier::new("k").verify(&token).await.unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.role, Role::User);
    }

    #[tokio::test]
    async fn test_jwt_verifier_rejects_garbage() {
        let result = JwtVerifier::new("k").verify("not-a-token").await;
        assert_matches!(result, Err(GatewayError::Unauthorized(_)));
    }
}
