//! Scheduled publishing
//!
//! A background task that moves due `scheduled` articles to `published`,
//! stamping `published_at` with the scheduled time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::task::JoinHandle;

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::ArticleRepository;
use crate::services::ServiceResult;

/// Publish every article whose scheduled time has passed
///
/// Returns the tenants that had articles published.
pub async fn publish_due_articles(
    repo: &dyn ArticleRepository,
    cache: &MemoryCache,
) -> ServiceResult<Vec<i64>> {
    let tenants = repo
        .publish_due(Utc::now())
        .await
        .context("Failed to publish scheduled articles")?;

    for tenant_id in &tenants {
        tracing::info!("Published scheduled articles for tenant {}", tenant_id);
        if let Err(e) = invalidate_tenant(cache, *tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
    Ok(tenants)
}

/// Run [`publish_due_articles`] every `interval_secs` seconds
///
/// Returns `None` when the interval is 0.
pub fn spawn_scheduler(
    interval_secs: u64,
    repo: Arc<dyn ArticleRepository>,
    cache: Arc<MemoryCache>,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("Scheduled publishing disabled");
        return None;
    }

    tracing::info!("Scheduled publishing every {}s", interval_secs);
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = publish_due_articles(repo.as_ref(), cache.as_ref()).await {
                tracing::error!("Scheduled publishing failed: {:#}", e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, tenant_key, CacheLayer};
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxArticleRepository;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_publish_due_articles() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        let now = Utc::now();
        for (slug, at) in [("due", now - ChronoDuration::minutes(5)), ("later", now + ChronoDuration::hours(1))] {
            sqlx::query(
                "INSERT INTO articles (tenant_id, slug, title, content, content_html, status, scheduled_at) \
                 VALUES (1, ?, 'T', 'c', '', 'scheduled', ?)",
            )
            .bind(slug)
            .bind(at)
            .execute(sqlite)
            .await
            .unwrap();
        }

        let repo = SqlxArticleRepository::boxed(pool.clone());
        let cache = create_cache(&CacheConfig::default());
        let key = tenant_key(1, "dashboard:stats");
        cache.set(&key, &1, cache.default_ttl()).await.unwrap();

        let tenants = publish_due_articles(repo.as_ref(), cache.as_ref()).await.unwrap();
        assert_eq!(tenants, vec![1]);
        assert_eq!(cache.get::<i32>(&key).await.unwrap(), None);

        let statuses: Vec<(String, String)> = sqlx::query_as("SELECT slug, status FROM articles ORDER BY id")
            .fetch_all(sqlite)
            .await
            .unwrap();
        assert_eq!(statuses[0], ("due".to_string(), "published".to_string()));
        assert_eq!(statuses[1], ("later".to_string(), "scheduled".to_string()));

        let again = publish_due_articles(repo.as_ref(), cache.as_ref()).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_client_articles_stay_scheduled() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        pool.execute("INSERT INTO clients (id, tenant_id, name, status) VALUES (7, 1, 'Pia', 'paused')")
            .await
            .unwrap();
        pool.execute("INSERT INTO clients (id, tenant_id, name) VALUES (8, 1, 'Ori')")
            .await
            .unwrap();
        let due = Utc::now() - ChronoDuration::minutes(5);
        for (slug, client_id) in [("paused-client", 7), ("active-client", 8)] {
            sqlx::query(
                "INSERT INTO articles (tenant_id, client_id, slug, title, content, content_html, status, scheduled_at) \
                 VALUES (1, ?, ?, 'T', 'c', '', 'scheduled', ?)",
            )
            .bind(client_id)
            .bind(slug)
            .bind(due)
            .execute(sqlite)
            .await
            .unwrap();
        }

        let repo = SqlxArticleRepository::boxed(pool.clone());
        let cache = create_cache(&CacheConfig::default());
        let tenants = publish_due_articles(repo.as_ref(), cache.as_ref()).await.unwrap();
        assert_eq!(tenants, vec![1]);

        let statuses: Vec<(String, String)> = sqlx::query_as("SELECT slug, status FROM articles ORDER BY id")
            .fetch_all(sqlite)
            .await
            .unwrap();
        assert_eq!(statuses[0], ("paused-client".to_string(), "scheduled".to_string()));
        assert_eq!(statuses[1], ("active-client".to_string(), "published".to_string()));

        // Nothing else is due until the client is reactivated
        assert!(publish_due_articles(repo.as_ref(), cache.as_ref()).await.unwrap().is_empty());
        pool.execute("UPDATE clients SET status = 'active' WHERE id = 7").await.unwrap();
        assert_eq!(publish_due_articles(repo.as_ref(), cache.as_ref()).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_zero_interval_disables_scheduler() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let handle = spawn_scheduler(
            0,
            SqlxArticleRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        );
        assert!(handle.is_none());
    }
}
