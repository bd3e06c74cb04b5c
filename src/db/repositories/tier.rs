//! Subscription tier repository
//!
//! This module provides:
//! - `TierRepository` trait defining the interface for tier data access
//! - `SqlxTierRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::SubscriptionTier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subscription tier repository trait
#[async_trait]
pub trait TierRepository: Send + Sync {
    /// Create a new tier
    async fn create(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier>;

    /// Get tier by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<SubscriptionTier>>;

    /// Check if a slug is taken within a tenant
    async fn exists_by_slug(&self, tenant_id: i64, slug: &str) -> Result<bool>;

    /// List tiers ordered by price
    async fn list(&self, tenant_id: i64, active_only: bool) -> Result<Vec<SubscriptionTier>>;

    /// Update a tier
    async fn update(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier>;

    /// Delete a tier; clients on it lose their tier. Returns false when absent.
    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool>;
}

/// SQLx-based tier repository implementation
pub struct SqlxTierRepository {
    pool: DynDatabasePool,
}

impl SqlxTierRepository {
    /// Create a new SQLx tier repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TierRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_TIER: &str = r#"
    INSERT INTO subscription_tiers
        (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_TIER_BY_ID: &str = r#"
    SELECT id, tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active, created_at, updated_at
    FROM subscription_tiers
    WHERE tenant_id = ? AND id = ?
"#;

const LIST_TIERS: &str = r#"
    SELECT id, tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active, created_at, updated_at
    FROM subscription_tiers
    WHERE tenant_id = ? AND (? = 0 OR is_active = 1)
    ORDER BY price_cents, id
"#;

const UPDATE_TIER: &str = r#"
    UPDATE subscription_tiers
    SET name = ?, monthly_article_quota = ?, price_cents = ?, description = ?, is_active = ?, updated_at = ?
    WHERE tenant_id = ? AND id = ?
"#;

const EXISTS_TIER_SLUG: &str =
    "SELECT COUNT(*) AS count FROM subscription_tiers WHERE tenant_id = ? AND slug = ?";

const DELETE_TIER: &str = "DELETE FROM subscription_tiers WHERE tenant_id = ? AND id = ?";

#[async_trait]
impl TierRepository for SqlxTierRepository {
    async fn create(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tier_sqlite(self.pool.sqlite()?, tier).await,
            DatabaseDriver::Mysql => create_tier_mysql(self.pool.mysql()?, tier).await,
        }
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<SubscriptionTier>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SELECT_TIER_BY_ID)
                    .bind(tenant_id)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get tier by ID")?;
                row.as_ref().map(row_to_tier_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SELECT_TIER_BY_ID)
                    .bind(tenant_id)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get tier by ID")?;
                row.as_ref().map(row_to_tier_mysql).transpose()
            }
        }
    }

    async fn exists_by_slug(&self, tenant_id: i64, slug: &str) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(EXISTS_TIER_SLUG)
                .bind(tenant_id)
                .bind(slug)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check tier slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(EXISTS_TIER_SLUG)
                .bind(tenant_id)
                .bind(slug)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check tier slug")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list(&self, tenant_id: i64, active_only: bool) -> Result<Vec<SubscriptionTier>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_TIERS)
                    .bind(tenant_id)
                    .bind(active_only)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list tiers")?;
                rows.iter().map(row_to_tier_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_TIERS)
                    .bind(tenant_id)
                    .bind(active_only)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list tiers")?;
                rows.iter().map(row_to_tier_mysql).collect()
            }
        }
    }

    async fn update(&self, tier: &SubscriptionTier) -> Result<SubscriptionTier> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_TIER)
                    .bind(&tier.name)
                    .bind(tier.monthly_article_quota)
                    .bind(tier.price_cents)
                    .bind(&tier.description)
                    .bind(tier.is_active)
                    .bind(now)
                    .bind(tier.tenant_id)
                    .bind(tier.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update tier")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_TIER)
                    .bind(&tier.name)
                    .bind(tier.monthly_article_quota)
                    .bind(tier.price_cents)
                    .bind(&tier.description)
                    .bind(tier.is_active)
                    .bind(now)
                    .bind(tier.tenant_id)
                    .bind(tier.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update tier")?;
            }
        }

        Ok(SubscriptionTier {
            updated_at: now,
            ..tier.clone()
        })
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_TIER)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete tier")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(DELETE_TIER)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete tier")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tier_sqlite(pool: &SqlitePool, tier: &SubscriptionTier) -> Result<SubscriptionTier> {
    let now = Utc::now();
    let result = sqlx::query(INSERT_TIER)
        .bind(tier.tenant_id)
        .bind(&tier.slug)
        .bind(&tier.name)
        .bind(tier.monthly_article_quota)
        .bind(tier.price_cents)
        .bind(&tier.description)
        .bind(tier.is_active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tier")?;

    Ok(SubscriptionTier {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..tier.clone()
    })
}

fn row_to_tier_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<SubscriptionTier> {
    Ok(SubscriptionTier {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        monthly_article_quota: row.get("monthly_article_quota"),
        price_cents: row.get("price_cents"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tier_mysql(pool: &MySqlPool, tier: &SubscriptionTier) -> Result<SubscriptionTier> {
    let now = Utc::now();
    let result = sqlx::query(INSERT_TIER)
        .bind(tier.tenant_id)
        .bind(&tier.slug)
        .bind(&tier.name)
        .bind(tier.monthly_article_quota)
        .bind(tier.price_cents)
        .bind(&tier.description)
        .bind(tier.is_active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tier")?;

    Ok(SubscriptionTier {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..tier.clone()
    })
}

fn row_to_tier_mysql(row: &sqlx::mysql::MySqlRow) -> Result<SubscriptionTier> {
    Ok(SubscriptionTier {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        monthly_article_quota: row.get("monthly_article_quota"),
        price_cents: row.get("price_cents"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
