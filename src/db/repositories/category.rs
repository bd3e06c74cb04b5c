//! Category repository
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Category>>;

    /// List categories ordered by name
    async fn list(&self, tenant_id: i64) -> Result<Vec<Category>>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, tenant_id: i64, slug: &str) -> Result<bool>;

    /// Delete a category; its articles become uncategorised
    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(self.pool.sqlite()?, category).await,
            DatabaseDriver::Mysql => create_category_mysql(self.pool.mysql()?, category).await,
        }
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_id_sqlite(self.pool.sqlite()?, tenant_id, id).await,
            DatabaseDriver::Mysql => get_category_by_id_mysql(self.pool.mysql()?, tenant_id, id).await,
        }
    }

    async fn list(&self, tenant_id: i64) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.sqlite()?, tenant_id).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.mysql()?, tenant_id).await,
        }
    }

    async fn exists_by_slug(&self, tenant_id: i64, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM categories WHERE tenant_id = ? AND slug = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(tenant_id)
                .bind(slug)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check category slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(tenant_id)
                .bind(slug)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check category slug")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool> {
        let sql = "DELETE FROM categories WHERE tenant_id = ? AND id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (tenant_id, slug, name, description, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(category.tenant_id)
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        ..category.clone()
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, tenant_id, slug, name, description, created_at
        FROM categories
        WHERE tenant_id = ? AND id = ?
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_categories_sqlite(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, tenant_id, slug, name, description, created_at
        FROM categories
        WHERE tenant_id = ?
        ORDER BY name
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    let mut categories = Vec::new();
    for row in rows {
        categories.push(row_to_category_sqlite(&row)?);
    }

    Ok(categories)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (tenant_id, slug, name, description, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(category.tenant_id)
    .bind(&category.slug)
    .bind(&category.name)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..category.clone()
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, tenant_id: i64, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, tenant_id, slug, name, description, created_at
        FROM categories
        WHERE tenant_id = ? AND id = ?
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_category_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_categories_mysql(pool: &MySqlPool, tenant_id: i64) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, tenant_id, slug, name, description, created_at
        FROM categories
        WHERE tenant_id = ?
        ORDER BY name
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    let mut categories = Vec::new();
    for row in rows {
        categories.push(row_to_category_mysql(&row)?);
    }

    Ok(categories)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    fn create_test_category(tenant_id: i64, slug: &str, name: &str) -> Category {
        Category {
            id: 0,
            tenant_id,
            slug: slug.to_string(),
            name: name.to_string(),
            description: Some(format!("Description for {}", name)),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_category() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&create_test_category(1, "guides", "Guides"))
            .await
            .expect("Failed to create category");

        assert!(created.id > 0);
        assert_eq!(created.slug, "guides");
        assert!(repo.exists_by_slug(1, "guides").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_category_scoped_to_tenant() {
        let repo = setup_test_repo().await;
        let created = repo.create(&create_test_category(1, "news", "News")).await.unwrap();

        assert!(repo.get_by_id(1, created.id).await.unwrap().is_some());
        assert!(repo.get_by_id(2, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_categories_sorted_by_name() {
        let repo = setup_test_repo().await;
        repo.create(&create_test_category(1, "zeta", "Zeta")).await.unwrap();
        repo.create(&create_test_category(1, "alpha", "Alpha")).await.unwrap();

        let names: Vec<String> = repo.list(1).await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_category() {
        let repo = setup_test_repo().await;
        let created = repo.create(&create_test_category(1, "old", "Old")).await.unwrap();
        assert!(repo.delete(1, created.id).await.unwrap());
        assert!(!repo.exists_by_slug(1, "old").await.unwrap());
    }
}
