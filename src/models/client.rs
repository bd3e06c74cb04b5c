//! Client model
//!
//! Clients are the customers articles are written for. Each may subscribe to
//! a tier, whose quota bounds the articles created for them per month.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Paused,
    Churned,
}

impl ClientStatus {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Paused => "paused",
            ClientStatus::Churned => "churned",
        }
    }
}

impl std::str::FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "churned" => Ok(Self::Churned),
            _ => Err(format!("Invalid client status: {}", s)),
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub status: ClientStatus,
    /// Subscribed tier, if any
    pub tier_id: Option<i64>,
    /// Set whenever a tier is assigned
    pub subscription_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Only active clients can receive new articles
    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }
}

/// Input for creating a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateClientInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub status: Option<ClientStatus>,
    #[serde(default)]
    pub tier_id: Option<i64>,
}

/// Input for updating a client
///
/// `tier_id: null` removes the client's tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClientInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub status: Option<ClientStatus>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub tier_id: Option<Option<i64>>,
}

/// Filter for client listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientFilter {
    pub status: Option<ClientStatus>,
    /// Matches name, company or email
    pub search: Option<String>,
}

/// Article usage of a client in the current calendar month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientUsage {
    pub client_id: i64,
    pub tier_id: Option<i64>,
    pub tier_name: Option<String>,
    /// None = unlimited
    pub monthly_quota: Option<i64>,
    pub used_this_month: i64,
    /// None = unlimited
    pub remaining: Option<i64>,
    /// First instant of the current month (UTC)
    pub period_start: DateTime<Utc>,
}

impl ClientUsage {
    /// Build usage from the quota and the articles already created
    pub fn new(
        client_id: i64,
        tier_id: Option<i64>,
        tier_name: Option<String>,
        monthly_quota: Option<i64>,
        used_this_month: i64,
        period_start: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            tier_id,
            tier_name,
            monthly_quota,
            used_this_month,
            remaining: monthly_quota.map(|quota| (quota - used_this_month).max(0)),
            period_start,
        }
    }

    /// Whether another article can be created this month
    pub fn has_capacity(&self) -> bool {
        self.remaining.map_or(true, |remaining| remaining > 0)
    }
}
