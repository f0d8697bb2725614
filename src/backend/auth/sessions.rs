/**
 * Session Tokens
 *
 * HS256 JWTs shared with the account service. The gateway only needs to
 * verify them; `create_token` exists for the test suite and for operators
 * minting tokens by hand.
 */

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::messaging::Role;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email
    pub email: String,
    /// Account role, `USER` when absent
    #[serde(default)]
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Create a JWT token for a user
///
/// # Arguments
/// * `secret` - HS256 signing secret
/// * `ttl` - Token lifetime
/// * `user_id` - User ID (UUID)
/// * `email` - User email
/// * `role` - Account role
pub fn create_token(
    secret: &str,
    ttl: Duration,
    user_id: Uuid,
    email: impl Into<String>,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = now_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.into(),
        role,
        exp: now + ttl.as_secs(),
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry, returning the claims
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_create_and_verify_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(SECRET, Duration::from_secs(60), user_id, "a@example.com", Role::Admin)
            .unwrap();

        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token =
            create_token(SECRET, Duration::from_secs(60), Uuid::new_v4(), "a@example.com", Role::User)
                .unwrap();
        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "a@example.com".into(),
            role: Role::User,
            exp: now_secs() - 3600,
            iat: now_secs() - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_verify_invalid_token() {
        assert!(verify_token(SECRET, "invalid.token.here").is_err());
    }
}
