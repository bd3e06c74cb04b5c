//! Tenant repository
//!
//! This module provides:
//! - `TenantRepository` trait defining the interface for tenant data access
//! - `SqlxTenantRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tenant;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tenant repository trait
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Create a new tenant
    async fn create(&self, slug: &str, name: &str) -> Result<Tenant>;

    /// Get tenant by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tenant>>;

    /// Get tenant by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;

    /// List all tenants ordered by slug
    async fn list(&self) -> Result<Vec<Tenant>>;
}

/// SQLx-based tenant repository implementation
pub struct SqlxTenantRepository {
    pool: DynDatabasePool,
}

impl SqlxTenantRepository {
    /// Create a new SQLx tenant repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TenantRepository> {
        Arc::new(Self::new(pool))
    }
}

const TENANT_COLUMNS: &str = "id, slug, name, created_at";

#[async_trait]
impl TenantRepository for SqlxTenantRepository {
    async fn create(&self, slug: &str, name: &str) -> Result<Tenant> {
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("INSERT INTO tenants (slug, name, created_at) VALUES (?, ?, ?)")
                    .bind(slug)
                    .bind(name)
                    .bind(now)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create tenant")?
                    .last_insert_rowid()
            }
            DatabaseDriver::Mysql => {
                sqlx::query("INSERT INTO tenants (slug, name, created_at) VALUES (?, ?, ?)")
                    .bind(slug)
                    .bind(name)
                    .bind(now)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create tenant")?
                    .last_insert_id() as i64
            }
        };

        Ok(Tenant {
            id,
            slug: slug.to_string(),
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tenant>> {
        let sql = format!("SELECT {} FROM tenants WHERE id = ?", TENANT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_tenant_sqlite(self.pool.sqlite()?, &sql, id).await,
            DatabaseDriver::Mysql => fetch_tenant_mysql(self.pool.mysql()?, &sql, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        let sql = format!("SELECT {} FROM tenants WHERE slug = ?", TENANT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_tenant_sqlite(self.pool.sqlite()?, &sql, slug.to_string()).await,
            DatabaseDriver::Mysql => fetch_tenant_mysql(self.pool.mysql()?, &sql, slug.to_string()).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tenant>> {
        let sql = format!("SELECT {} FROM tenants ORDER BY slug", TENANT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list tenants")?;
                rows.iter().map(row_to_tenant_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list tenants")?;
                rows.iter().map(row_to_tenant_mysql).collect()
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn fetch_tenant_sqlite<K>(pool: &SqlitePool, sql: &str, key: K) -> Result<Option<Tenant>>
where
    K: for<'q> sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite> + Send + 'static,
{
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get tenant")?;

    row.as_ref().map(row_to_tenant_sqlite).transpose()
}

fn row_to_tenant_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tenant> {
    Ok(Tenant {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn fetch_tenant_mysql<K>(pool: &MySqlPool, sql: &str, key: K) -> Result<Option<Tenant>>
where
    K: for<'q> sqlx::Encode<'q, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + 'static,
{
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get tenant")?;

    row.as_ref().map(row_to_tenant_mysql).transpose()
}

fn row_to_tenant_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tenant> {
    Ok(Tenant {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxTenantRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTenantRepository::new(pool)
    }

    #[tokio::test]
    async fn test_default_tenant_exists() {
        let repo = setup_test_repo().await;
        let tenant = repo
            .get_by_slug("default")
            .await
            .expect("Failed to get tenant")
            .expect("Default tenant missing");
        assert_eq!(tenant.name, "Default");
    }

    #[tokio::test]
    async fn test_create_and_list_tenants() {
        let repo = setup_test_repo().await;
        let created = repo.create("acme", "Acme Inc").await.expect("Failed to create tenant");
        assert!(created.id > 1);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.slug, "acme");

        let slugs: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.slug).collect();
        assert_eq!(slugs, vec!["acme".to_string(), "default".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup_test_repo().await;
        assert!(repo.create("default", "Again").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let repo = setup_test_repo().await;
        assert!(repo.get_by_slug("nope").await.unwrap().is_none());
    }
}
