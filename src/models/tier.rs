//! Subscription tier model
//!
//! A tier is a plan clients subscribe to. Its monthly article quota caps how
//! many articles can be created for a client per calendar month; `None`
//! means unlimited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionTier {
    /// Unique identifier
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// URL-friendly slug, unique per tenant
    pub slug: String,
    /// Display name
    pub name: String,
    /// Articles allowed per calendar month (None = unlimited)
    pub monthly_article_quota: Option<i64>,
    /// Monthly price in cents
    pub price_cents: i64,
    /// Marketing description
    pub description: Option<String>,
    /// Inactive tiers cannot be assigned to clients
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionTier {
    /// Whether this tier places no cap on monthly articles
    pub fn is_unlimited(&self) -> bool {
        self.monthly_article_quota.is_none()
    }
}

/// Input for creating a tier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTierInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub monthly_article_quota: Option<i64>,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Input for updating a tier
///
/// `monthly_article_quota: null` switches the tier to unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTierInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub monthly_article_quota: Option<Option<i64>>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_tier_input_distinguishes_null_from_absent() {
        let absent: UpdateTierInput = serde_json::from_str(r#"{"name":"Pro"}"#).unwrap();
        assert_eq!(absent.monthly_article_quota, None);

        let cleared: UpdateTierInput =
            serde_json::from_str(r#"{"monthly_article_quota":null}"#).unwrap();
        assert_eq!(cleared.monthly_article_quota, Some(None));

        let set: UpdateTierInput = serde_json::from_str(r#"{"monthly_article_quota":8}"#).unwrap();
        assert_eq!(set.monthly_article_quota, Some(Some(8)));
    }
}
