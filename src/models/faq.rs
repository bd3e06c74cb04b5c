//! FAQ model
//!
//! FAQs carry helpful/unhelpful counters driven by reader feedback. Each
//! reader (user or anonymous session) holds at most one vote per FAQ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// FAQ entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faq {
    pub id: i64,
    pub tenant_id: i64,
    pub question: String,
    pub answer: String,
    /// Free-form grouping label
    pub category: Option<String>,
    /// Ascending display order
    pub sort_order: i64,
    pub is_published: bool,
    /// Helpful votes, never negative
    pub upvotes: i64,
    /// Unhelpful votes, never negative
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an FAQ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFaqInput {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// Input for updating an FAQ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFaqInput {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// Who is voting on an FAQ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackIdentity {
    /// A signed-in user
    User(i64),
    /// An anonymous reader session
    Session(String),
}

impl FeedbackIdentity {
    /// Prefer the user id; fall back to a non-blank session id
    pub fn from_parts(user_id: Option<i64>, session_id: Option<&str>) -> Option<Self> {
        if let Some(user_id) = user_id {
            return Some(Self::User(user_id));
        }
        session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self::Session(s.to_string()))
    }
}

/// What a feedback submission did to the stored vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackOutcome {
    /// Same vote as before, nothing changed
    Unchanged,
    /// Existing vote flipped
    Changed,
    /// First vote from this identity
    Recorded,
}

/// Result of a feedback submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqFeedbackResult {
    pub faq_id: i64,
    pub outcome: FeedbackOutcome,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_user() {
        assert_eq!(
            FeedbackIdentity::from_parts(Some(3), Some("abc")),
            Some(FeedbackIdentity::User(3))
        );
        assert_eq!(
            FeedbackIdentity::from_parts(None, Some(" abc ")),
            Some(FeedbackIdentity::Session("abc".to_string()))
        );
        assert_eq!(FeedbackIdentity::from_parts(None, Some("  ")), None);
        assert_eq!(FeedbackIdentity::from_parts(None, None), None);
    }
}
