//! User model
//!
//! Users are the editorial staff and the registered readers of a tenant.
//! Passwords and sessions are managed outside this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// Username (unique per tenant)
    pub username: String,
    /// Email address (unique per tenant)
    pub email: String,
    /// Name shown on bylines and profiles
    pub display_name: Option<String>,
    /// Short biography
    pub bio: Option<String>,
    /// Avatar URL
    pub avatar: Option<String>,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to the username
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Compact public view of the user
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// User role.
///
/// - Admin: manages the tenant
/// - Editor: edits all content
/// - Author: writes articles
/// - Reader: comments, likes and follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Author,
    #[default]
    Reader,
}

impl UserRole {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Author => "author",
            UserRole::Reader => "reader",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            "author" => Ok(UserRole::Author),
            "reader" => Ok(UserRole::Reader),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Input for updating a user's own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UpdateProfileInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.display_name.is_some() || self.bio.is_some() || self.avatar.is_some()
    }
}

/// Compact user reference embedded in other responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

/// Public profile with social counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub joined_at: DateTime<Utc>,
    pub follower_count: i64,
    pub following_count: i64,
    /// Published articles authored by the user
    pub article_count: i64,
    pub favorite_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            tenant_id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            display_name: None,
            bio: None,
            avatar: None,
            role: UserRole::Author,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_name_falls_back_to_username() {
        let mut user = sample_user();
        assert_eq!(user.name(), "ada");
        user.display_name = Some("Ada Lovelace".to_string());
        assert_eq!(user.name(), "Ada Lovelace");
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [UserRole::Admin, UserRole::Editor, UserRole::Author, UserRole::Reader] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_default_role_is_reader() {
        assert_eq!(UserRole::default(), UserRole::Reader);
    }
}
