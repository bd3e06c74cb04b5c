//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// URL-friendly slug (unique per tenant)
    pub slug: String,
    /// Category name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    /// Generated from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
