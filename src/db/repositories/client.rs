//! Client repository
//!
//! This module provides:
//! - `ClientRepository` trait defining the interface for client data access
//! - `SqlxClientRepository` implementing the trait for SQLite and MySQL
//!
//! Optional filters are bound as `(? IS NULL OR column = ?)` pairs so each
//! query stays a single static statement.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Client, ClientFilter, ClientStatus, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Client repository trait
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Create a new client
    async fn create(&self, client: &Client) -> Result<Client>;

    /// Get client by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Client>>;

    /// List clients, newest first
    async fn list(&self, tenant_id: i64, filter: &ClientFilter, params: &ListParams) -> Result<Vec<Client>>;

    /// Count clients matching a filter
    async fn count(&self, tenant_id: i64, filter: &ClientFilter) -> Result<i64>;

    /// Update a client
    async fn update(&self, client: &Client) -> Result<Client>;

    /// Delete a client; its articles keep existing without a client
    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool>;

    /// Articles created for a client at or after `since`
    async fn count_articles_since(&self, client_id: i64, since: DateTime<Utc>) -> Result<i64>;
}

/// SQLx-based client repository implementation
pub struct SqlxClientRepository {
    pool: DynDatabasePool,
}

impl SqlxClientRepository {
    /// Create a new SQLx client repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ClientRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_CLIENT: &str = r#"
    INSERT INTO clients
        (tenant_id, name, email, company, website, status, tier_id, subscription_started_at, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_CLIENT_BY_ID: &str = r#"
    SELECT id, tenant_id, name, email, company, website, status, tier_id, subscription_started_at, created_at, updated_at
    FROM clients
    WHERE tenant_id = ? AND id = ?
"#;

const LIST_CLIENTS: &str = r#"
    SELECT id, tenant_id, name, email, company, website, status, tier_id, subscription_started_at, created_at, updated_at
    FROM clients
    WHERE tenant_id = ?
      AND (? IS NULL OR status = ?)
      AND (? IS NULL OR LOWER(name) LIKE ? OR LOWER(company) LIKE ? OR LOWER(email) LIKE ?)
    ORDER BY created_at DESC, id DESC
    LIMIT ? OFFSET ?
"#;

const COUNT_CLIENTS: &str = r#"
    SELECT COUNT(*) AS count
    FROM clients
    WHERE tenant_id = ?
      AND (? IS NULL OR status = ?)
      AND (? IS NULL OR LOWER(name) LIKE ? OR LOWER(company) LIKE ? OR LOWER(email) LIKE ?)
"#;

const UPDATE_CLIENT: &str = r#"
    UPDATE clients
    SET name = ?, email = ?, company = ?, website = ?, status = ?, tier_id = ?,
        subscription_started_at = ?, updated_at = ?
    WHERE tenant_id = ? AND id = ?
"#;

const DELETE_CLIENT: &str = "DELETE FROM clients WHERE tenant_id = ? AND id = ?";

const COUNT_CLIENT_ARTICLES_SINCE: &str =
    "SELECT COUNT(*) AS count FROM articles WHERE client_id = ? AND created_at >= ?";

/// Bind values shared by the list and count queries
struct FilterBinds {
    status: Option<&'static str>,
    pattern: Option<String>,
}

impl FilterBinds {
    fn new(filter: &ClientFilter) -> Self {
        Self {
            status: filter.status.map(|s| s.as_str()),
            pattern: filter
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("%{}%", s.to_lowercase())),
        }
    }
}

#[async_trait]
impl ClientRepository for SqlxClientRepository {
    async fn create(&self, client: &Client) -> Result<Client> {
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_CLIENT)
                .bind(client.tenant_id)
                .bind(&client.name)
                .bind(&client.email)
                .bind(&client.company)
                .bind(&client.website)
                .bind(client.status.as_str())
                .bind(client.tier_id)
                .bind(client.subscription_started_at)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create client")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_CLIENT)
                .bind(client.tenant_id)
                .bind(&client.name)
                .bind(&client.email)
                .bind(&client.company)
                .bind(&client.website)
                .bind(client.status.as_str())
                .bind(client.tier_id)
                .bind(client.subscription_started_at)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create client")?
                .last_insert_id() as i64,
        };

        Ok(Client {
            id,
            created_at: now,
            updated_at: now,
            ..client.clone()
        })
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Client>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_client_sqlite(self.pool.sqlite()?, tenant_id, id).await,
            DatabaseDriver::Mysql => get_client_mysql(self.pool.mysql()?, tenant_id, id).await,
        }
    }

    async fn list(&self, tenant_id: i64, filter: &ClientFilter, params: &ListParams) -> Result<Vec<Client>> {
        let binds = FilterBinds::new(filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_clients_sqlite(self.pool.sqlite()?, tenant_id, &binds, params).await,
            DatabaseDriver::Mysql => list_clients_mysql(self.pool.mysql()?, tenant_id, &binds, params).await,
        }
    }

    async fn count(&self, tenant_id: i64, filter: &ClientFilter) -> Result<i64> {
        let binds = FilterBinds::new(filter);
        let row_count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(COUNT_CLIENTS)
                .bind(tenant_id)
                .bind(binds.status)
                .bind(binds.status)
                .bind(&binds.pattern)
                .bind(&binds.pattern)
                .bind(&binds.pattern)
                .bind(&binds.pattern)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count clients")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(COUNT_CLIENTS)
                .bind(tenant_id)
                .bind(binds.status)
                .bind(binds.status)
                .bind(&binds.pattern)
                .bind(&binds.pattern)
                .bind(&binds.pattern)
                .bind(&binds.pattern)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count clients")?
                .get("count"),
        };
        Ok(row_count)
    }

    async fn update(&self, client: &Client) -> Result<Client> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_CLIENT)
                    .bind(&client.name)
                    .bind(&client.email)
                    .bind(&client.company)
                    .bind(&client.website)
                    .bind(client.status.as_str())
                    .bind(client.tier_id)
                    .bind(client.subscription_started_at)
                    .bind(now)
                    .bind(client.tenant_id)
                    .bind(client.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update client")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_CLIENT)
                    .bind(&client.name)
                    .bind(&client.email)
                    .bind(&client.company)
                    .bind(&client.website)
                    .bind(client.status.as_str())
                    .bind(client.tier_id)
                    .bind(client.subscription_started_at)
                    .bind(now)
                    .bind(client.tenant_id)
                    .bind(client.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update client")?;
            }
        }

        Ok(Client {
            updated_at: now,
            ..client.clone()
        })
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_CLIENT)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete client")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(DELETE_CLIENT)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete client")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count_articles_since(&self, client_id: i64, since: DateTime<Utc>) -> Result<i64> {
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(COUNT_CLIENT_ARTICLES_SINCE)
                .bind(client_id)
                .bind(since)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count client articles")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(COUNT_CLIENT_ARTICLES_SINCE)
                .bind(client_id)
                .bind(since)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count client articles")?
                .get("count"),
        };
        Ok(count)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_client_sqlite(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<Option<Client>> {
    let row = sqlx::query(SELECT_CLIENT_BY_ID)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get client by ID")?;

    row.as_ref().map(row_to_client_sqlite).transpose()
}

async fn list_clients_sqlite(
    pool: &SqlitePool,
    tenant_id: i64,
    binds: &FilterBinds,
    params: &ListParams,
) -> Result<Vec<Client>> {
    let rows = sqlx::query(LIST_CLIENTS)
        .bind(tenant_id)
        .bind(binds.status)
        .bind(binds.status)
        .bind(&binds.pattern)
        .bind(&binds.pattern)
        .bind(&binds.pattern)
        .bind(&binds.pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list clients")?;

    rows.iter().map(row_to_client_sqlite).collect()
}

fn row_to_client_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Client> {
    let status_str: String = row.get("status");
    let status: ClientStatus = status_str.parse().map_err(anyhow::Error::msg)?;

    Ok(Client {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        website: row.get("website"),
        status,
        tier_id: row.get("tier_id"),
        subscription_started_at: row.get("subscription_started_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_client_mysql(pool: &MySqlPool, tenant_id: i64, id: i64) -> Result<Option<Client>> {
    let row = sqlx::query(SELECT_CLIENT_BY_ID)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get client by ID")?;

    row.as_ref().map(row_to_client_mysql).transpose()
}

async fn list_clients_mysql(
    pool: &MySqlPool,
    tenant_id: i64,
    binds: &FilterBinds,
    params: &ListParams,
) -> Result<Vec<Client>> {
    let rows = sqlx::query(LIST_CLIENTS)
        .bind(tenant_id)
        .bind(binds.status)
        .bind(binds.status)
        .bind(&binds.pattern)
        .bind(&binds.pattern)
        .bind(&binds.pattern)
        .bind(&binds.pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list clients")?;

    rows.iter().map(row_to_client_mysql).collect()
}

fn row_to_client_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Client> {
    let status_str: String = row.get("status");
    let status: ClientStatus = status_str.parse().map_err(anyhow::Error::msg)?;

    Ok(Client {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        website: row.get("website"),
        status,
        tier_id: row.get("tier_id"),
        subscription_started_at: row.get("subscription_started_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxClientRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxClientRepository::new(pool.clone());
        (pool, repo)
    }

    fn new_client(name: &str, company: Option<&str>, status: ClientStatus) -> Client {
        let now = Utc::now();
        Client {
            id: 0,
            tenant_id: 1,
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            company: company.map(str::to_string),
            website: None,
            status,
            tier_id: Some(1),
            subscription_started_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_client() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&new_client("Dana", Some("Acme"), ClientStatus::Active))
            .await
            .expect("Failed to create client");

        let found = repo.get_by_id(1, created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Dana");
        assert_eq!(found.tier_id, Some(1));
        assert!(repo.get_by_id(2, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_search() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&new_client("Dana", Some("Acme"), ClientStatus::Active)).await.unwrap();
        repo.create(&new_client("Eli", Some("Globex"), ClientStatus::Paused)).await.unwrap();
        repo.create(&new_client("Fay", None, ClientStatus::Active)).await.unwrap();

        let params = ListParams::default();
        let active = ClientFilter {
            status: Some(ClientStatus::Active),
            search: None,
        };
        assert_eq!(repo.list(1, &active, &params).await.unwrap().len(), 2);
        assert_eq!(repo.count(1, &active).await.unwrap(), 2);

        let search = ClientFilter {
            status: None,
            search: Some("GLOB".to_string()),
        };
        let found = repo.list(1, &search, &params).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Eli");

        assert_eq!(repo.count(1, &ClientFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_deleting_tier_clears_client_tier() {
        let (pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&new_client("Dana", None, ClientStatus::Active))
            .await
            .unwrap();

        pool.execute("DELETE FROM subscription_tiers WHERE id = 1").await.unwrap();

        let found = repo.get_by_id(1, created.id).await.unwrap().unwrap();
        assert_eq!(found.tier_id, None);
    }

    #[tokio::test]
    async fn test_update_and_delete_client() {
        let (_pool, repo) = setup_test_repo().await;
        let mut client = repo
            .create(&new_client("Dana", None, ClientStatus::Active))
            .await
            .unwrap();

        client.status = ClientStatus::Churned;
        client.tier_id = None;
        repo.update(&client).await.unwrap();

        let found = repo.get_by_id(1, client.id).await.unwrap().unwrap();
        assert_eq!(found.status, ClientStatus::Churned);
        assert_eq!(found.tier_id, None);

        assert!(repo.delete(1, client.id).await.unwrap());
        assert!(repo.get_by_id(1, client.id).await.unwrap().is_none());
    }
}
