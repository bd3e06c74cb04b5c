//! Subscriber repository
//!
//! This module provides:
//! - `SubscriberRepository` trait defining the interface for newsletter subscribers
//! - `SqlxSubscriberRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Subscriber, SubscriberStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subscriber repository trait
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Insert a new subscribed email
    async fn create(&self, subscriber: &Subscriber) -> Result<Subscriber>;

    /// Look up an email within a tenant
    async fn get_by_email(&self, tenant_id: i64, email: &str) -> Result<Option<Subscriber>>;

    /// Mark an existing row as subscribed again
    async fn resubscribe(
        &self,
        id: i64,
        name: Option<&str>,
        source: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Mark an email as unsubscribed. Returns false when it was not subscribed.
    async fn unsubscribe(&self, tenant_id: i64, email: &str, at: DateTime<Utc>) -> Result<bool>;

    /// List subscribers, newest first, with the total count
    async fn list(
        &self,
        tenant_id: i64,
        status: Option<SubscriberStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Subscriber>, i64)>;

    /// Delete a subscriber row
    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool>;

    /// Count subscribers, optionally by status
    async fn count(&self, tenant_id: i64, status: Option<SubscriberStatus>) -> Result<i64>;
}

/// SQLx-based subscriber repository implementation
pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    /// Create a new SQLx subscriber repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_SUBSCRIBER: &str = r#"
    INSERT INTO subscribers (tenant_id, email, name, status, source, subscribed_at, unsubscribed_at)
    VALUES (?, ?, ?, ?, ?, ?, NULL)
"#;

const SELECT_BY_EMAIL: &str = r#"
    SELECT id, tenant_id, email, name, status, source, subscribed_at, unsubscribed_at
    FROM subscribers
    WHERE tenant_id = ? AND email = ?
"#;

const RESUBSCRIBE: &str = r#"
    UPDATE subscribers
    SET status = 'subscribed', name = COALESCE(?, name), source = COALESCE(?, source),
        subscribed_at = ?, unsubscribed_at = NULL
    WHERE id = ?
"#;

const UNSUBSCRIBE: &str = r#"
    UPDATE subscribers
    SET status = 'unsubscribed', unsubscribed_at = ?
    WHERE tenant_id = ? AND email = ? AND status = 'subscribed'
"#;

const LIST_SUBSCRIBERS: &str = r#"
    SELECT id, tenant_id, email, name, status, source, subscribed_at, unsubscribed_at
    FROM subscribers
    WHERE tenant_id = ? AND (? IS NULL OR status = ?)
    ORDER BY subscribed_at DESC, id DESC
    LIMIT ? OFFSET ?
"#;

const COUNT_SUBSCRIBERS: &str =
    "SELECT COUNT(*) AS count FROM subscribers WHERE tenant_id = ? AND (? IS NULL OR status = ?)";

const DELETE_SUBSCRIBER: &str = "DELETE FROM subscribers WHERE tenant_id = ? AND id = ?";

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create(&self, subscriber: &Subscriber) -> Result<Subscriber> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_SUBSCRIBER)
                .bind(subscriber.tenant_id)
                .bind(&subscriber.email)
                .bind(&subscriber.name)
                .bind(subscriber.status.as_str())
                .bind(&subscriber.source)
                .bind(subscriber.subscribed_at)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create subscriber")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_SUBSCRIBER)
                .bind(subscriber.tenant_id)
                .bind(&subscriber.email)
                .bind(&subscriber.name)
                .bind(subscriber.status.as_str())
                .bind(&subscriber.source)
                .bind(subscriber.subscribed_at)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create subscriber")?
                .last_insert_id() as i64,
        };
        Ok(Subscriber {
            id,
            ..subscriber.clone()
        })
    }

    async fn get_by_email(&self, tenant_id: i64, email: &str) -> Result<Option<Subscriber>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SELECT_BY_EMAIL)
                    .bind(tenant_id)
                    .bind(email)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get subscriber")?;
                row.as_ref().map(row_to_subscriber_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SELECT_BY_EMAIL)
                    .bind(tenant_id)
                    .bind(email)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get subscriber")?;
                row.as_ref().map(row_to_subscriber_mysql).transpose()
            }
        }
    }

    async fn resubscribe(
        &self,
        id: i64,
        name: Option<&str>,
        source: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(RESUBSCRIBE)
                    .bind(name)
                    .bind(source)
                    .bind(at)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to resubscribe")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(RESUBSCRIBE)
                    .bind(name)
                    .bind(source)
                    .bind(at)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to resubscribe")?;
            }
        }
        Ok(())
    }

    async fn unsubscribe(&self, tenant_id: i64, email: &str, at: DateTime<Utc>) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UNSUBSCRIBE)
                .bind(at)
                .bind(tenant_id)
                .bind(email)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to unsubscribe")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(UNSUBSCRIBE)
                .bind(at)
                .bind(tenant_id)
                .bind(email)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to unsubscribe")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(
        &self,
        tenant_id: i64,
        status: Option<SubscriberStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Subscriber>, i64)> {
        let status = status.map(|s| s.as_str());
        let total = self.count_by_str(tenant_id, status).await?;

        let items = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_SUBSCRIBERS)
                    .bind(tenant_id)
                    .bind(status)
                    .bind(status)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list subscribers")?;
                rows.iter().map(row_to_subscriber_sqlite).collect::<Result<Vec<_>>>()?
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_SUBSCRIBERS)
                    .bind(tenant_id)
                    .bind(status)
                    .bind(status)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list subscribers")?;
                rows.iter().map(row_to_subscriber_mysql).collect::<Result<Vec<_>>>()?
            }
        };

        Ok((items, total))
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_SUBSCRIBER)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete subscriber")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(DELETE_SUBSCRIBER)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete subscriber")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count(&self, tenant_id: i64, status: Option<SubscriberStatus>) -> Result<i64> {
        self.count_by_str(tenant_id, status.map(|s| s.as_str())).await
    }
}

impl SqlxSubscriberRepository {
    async fn count_by_str(&self, tenant_id: i64, status: Option<&'static str>) -> Result<i64> {
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(COUNT_SUBSCRIBERS)
                .bind(tenant_id)
                .bind(status)
                .bind(status)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count subscribers")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(COUNT_SUBSCRIBERS)
                .bind(tenant_id)
                .bind(status)
                .bind(status)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count subscribers")?
                .get("count"),
        };
        Ok(count)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_subscriber_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Subscriber> {
    let status_str: String = row.get("status");
    Ok(Subscriber {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        email: row.get("email"),
        name: row.get("name"),
        status: status_str.parse().map_err(anyhow::Error::msg)?,
        source: row.get("source"),
        subscribed_at: row.get("subscribed_at"),
        unsubscribed_at: row.get("unsubscribed_at"),
    })
}

fn row_to_subscriber_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Subscriber> {
    let status_str: String = row.get("status");
    Ok(Subscriber {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        email: row.get("email"),
        name: row.get("name"),
        status: status_str.parse().map_err(anyhow::Error::msg)?,
        source: row.get("source"),
        subscribed_at: row.get("subscribed_at"),
        unsubscribed_at: row.get("unsubscribed_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxSubscriberRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSubscriberRepository::new(pool)
    }

    fn new_subscriber(email: &str) -> Subscriber {
        Subscriber {
            id: 0,
            tenant_id: 1,
            email: email.to_string(),
            name: None,
            status: SubscriberStatus::Subscribed,
            source: Some("footer".to_string()),
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        }
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe_resubscribe() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_subscriber("a@example.com")).await.unwrap();

        assert!(repo.unsubscribe(1, "a@example.com", Utc::now()).await.unwrap());
        assert!(!repo.unsubscribe(1, "a@example.com", Utc::now()).await.unwrap());

        let found = repo.get_by_email(1, "a@example.com").await.unwrap().unwrap();
        assert_eq!(found.status, SubscriberStatus::Unsubscribed);
        assert!(found.unsubscribed_at.is_some());

        repo.resubscribe(created.id, Some("Ann"), None, Utc::now()).await.unwrap();
        let found = repo.get_by_email(1, "a@example.com").await.unwrap().unwrap();
        assert_eq!(found.status, SubscriberStatus::Subscribed);
        assert_eq!(found.name.as_deref(), Some("Ann"));
        assert_eq!(found.source.as_deref(), Some("footer"));
        assert!(found.unsubscribed_at.is_none());
    }

    #[tokio::test]
    async fn test_list_and_count_by_status() {
        let repo = setup_test_repo().await;
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            repo.create(&new_subscriber(email)).await.unwrap();
        }
        repo.unsubscribe(1, "b@example.com", Utc::now()).await.unwrap();

        assert_eq!(repo.count(1, None).await.unwrap(), 3);
        assert_eq!(repo.count(1, Some(SubscriberStatus::Subscribed)).await.unwrap(), 2);

        let (items, total) = repo
            .list(1, Some(SubscriberStatus::Unsubscribed), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].email, "b@example.com");
    }

    #[tokio::test]
    async fn test_delete_subscriber() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_subscriber("a@example.com")).await.unwrap();
        assert!(!repo.delete(2, created.id).await.unwrap());
        assert!(repo.delete(1, created.id).await.unwrap());
        assert!(repo.get_by_email(1, "a@example.com").await.unwrap().is_none());
    }
}
