//! User Data Structures
//!
//! Users are owned by the account service; the gateway only reads them to
//! resolve message receivers and to decorate read-side views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role carried in tokens and stored on the user row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse the database representation, defaulting to `User`
    pub fn from_db(value: &str) -> Self {
        match value {
            "ADMIN" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a verified user with a fresh id, mostly useful for seeding
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            role: Role::User,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public projection of a user attached to read-side views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

/// Sender decoration on group messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub id: Uuid,
    pub display_name: String,
}

impl From<&User> for SenderInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_db_string() {
        assert_eq!(Role::from_db(Role::Admin.as_str()), Role::Admin);
        assert_eq!(Role::from_db("something-else"), Role::User);
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User::new("ada@example.com", "Ada");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["displayName"], "Ada");
        assert_eq!(json["role"], "USER");
        assert_eq!(json["isVerified"], true);
    }
}
