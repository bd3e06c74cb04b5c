//! Tag repository
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Tags are created on demand from the names attached to an article.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get the tag with this slug, creating it when missing
    async fn find_or_create(&self, tenant_id: i64, slug: &str, name: &str) -> Result<Tag>;

    /// List a tenant's tags ordered by name
    async fn list(&self, tenant_id: i64) -> Result<Vec<Tag>>;

    /// Get tags attached to an article
    async fn get_by_article_id(&self, article_id: i64) -> Result<Vec<Tag>>;

    /// Replace the tags attached to an article
    async fn set_for_article(&self, article_id: i64, tag_ids: &[i64]) -> Result<()>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_TAG_BY_SLUG: &str =
    "SELECT id, tenant_id, slug, name, created_at FROM tags WHERE tenant_id = ? AND slug = ?";

const LIST_TAGS: &str =
    "SELECT id, tenant_id, slug, name, created_at FROM tags WHERE tenant_id = ? ORDER BY name";

const SELECT_ARTICLE_TAGS: &str = r#"
    SELECT t.id, t.tenant_id, t.slug, t.name, t.created_at
    FROM tags t
    INNER JOIN article_tags at ON t.id = at.tag_id
    WHERE at.article_id = ?
    ORDER BY t.name
"#;

const CLEAR_ARTICLE_TAGS: &str = "DELETE FROM article_tags WHERE article_id = ?";

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn find_or_create(&self, tenant_id: i64, slug: &str, name: &str) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_or_create_tag_sqlite(self.pool.sqlite()?, tenant_id, slug, name).await,
            DatabaseDriver::Mysql => find_or_create_tag_mysql(self.pool.mysql()?, tenant_id, slug, name).await,
        }
    }

    async fn list(&self, tenant_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_TAGS)
                    .bind(tenant_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list tags")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_TAGS)
                    .bind(tenant_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list tags")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn get_by_article_id(&self, article_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(SELECT_ARTICLE_TAGS)
                    .bind(article_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to get article tags")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(SELECT_ARTICLE_TAGS)
                    .bind(article_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to get article tags")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn set_for_article(&self, article_id: i64, tag_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_article_tags_sqlite(self.pool.sqlite()?, article_id, tag_ids).await,
            DatabaseDriver::Mysql => set_article_tags_mysql(self.pool.mysql()?, article_id, tag_ids).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_or_create_tag_sqlite(pool: &SqlitePool, tenant_id: i64, slug: &str, name: &str) -> Result<Tag> {
    sqlx::query("INSERT OR IGNORE INTO tags (tenant_id, slug, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(tenant_id)
        .bind(slug)
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    let row = sqlx::query(SELECT_TAG_BY_SLUG)
        .bind(tenant_id)
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to get tag by slug")?;

    row_to_tag_sqlite(&row)
}

async fn set_article_tags_sqlite(pool: &SqlitePool, article_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(CLEAR_ARTICLE_TAGS)
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add tag to article")?;
    }

    tx.commit().await.context("Failed to commit article tags")?;
    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_or_create_tag_mysql(pool: &MySqlPool, tenant_id: i64, slug: &str, name: &str) -> Result<Tag> {
    sqlx::query("INSERT IGNORE INTO tags (tenant_id, slug, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(tenant_id)
        .bind(slug)
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    let row = sqlx::query(SELECT_TAG_BY_SLUG)
        .bind(tenant_id)
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to get tag by slug")?;

    row_to_tag_mysql(&row)
}

async fn set_article_tags_mysql(pool: &MySqlPool, article_id: i64, tag_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(CLEAR_ARTICLE_TAGS)
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add tag to article")?;
    }

    tx.commit().await.context("Failed to commit article tags")?;
    Ok(())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}
