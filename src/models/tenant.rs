//! Tenant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An isolated workspace. Every other record belongs to exactly one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    pub id: i64,
    /// Value clients send in the `X-Tenant` header
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenantInput {
    pub name: String,
    /// Generated from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
}
