//! Analytics repository
//!
//! Read-only aggregate queries behind the admin dashboard. Each method is an
//! independent statement so the service can run them concurrently.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{DailyViews, StatusCount, TierBreakdown, TopArticle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

/// Record types whose growth the dashboard tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMetric {
    Articles,
    Clients,
    Subscribers,
    Views,
}

impl TrendMetric {
    /// Table and timestamp column counted for this metric
    fn source(&self) -> (&'static str, &'static str) {
        match self {
            TrendMetric::Articles => ("articles", "created_at"),
            TrendMetric::Clients => ("clients", "created_at"),
            TrendMetric::Subscribers => ("subscribers", "subscribed_at"),
            TrendMetric::Views => ("analytics", "occurred_at"),
        }
    }
}

/// Analytics repository trait
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Number of articles per status; statuses without articles are omitted
    async fn article_status_counts(&self, tenant_id: i64) -> Result<Vec<StatusCount>>;

    /// Total and active client counts
    async fn client_counts(&self, tenant_id: i64) -> Result<(i64, i64)>;

    /// Sum of article view counters
    async fn total_views(&self, tenant_id: i64) -> Result<i64>;

    /// Sum of SEO scores and number of articles
    async fn seo_score_totals(&self, tenant_id: i64) -> Result<(i64, i64)>;

    /// Records of a metric created in `[from, to)`
    async fn count_between(
        &self,
        tenant_id: i64,
        metric: TrendMetric,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64>;

    /// Most viewed articles
    async fn top_articles(&self, tenant_id: i64, limit: i64) -> Result<Vec<TopArticle>>;

    /// View events at or after `since`, counted per UTC day. Days without
    /// views are absent.
    async fn daily_views_since(&self, tenant_id: i64, since: DateTime<Utc>) -> Result<Vec<DailyViews>>;

    /// Clients grouped by subscription tier, clients without a tier included
    async fn client_breakdown(&self, tenant_id: i64) -> Result<Vec<TierBreakdown>>;
}

/// SQLx-based analytics repository implementation
pub struct SqlxAnalyticsRepository {
    pool: DynDatabasePool,
}

impl SqlxAnalyticsRepository {
    /// Create a new SQLx analytics repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AnalyticsRepository> {
        Arc::new(Self::new(pool))
    }
}

const STATUS_COUNTS: &str =
    "SELECT status, COUNT(*) AS count FROM articles WHERE tenant_id = ? GROUP BY status ORDER BY status";

const CLIENT_COUNTS: &str = r#"
    SELECT COUNT(*) AS total, COUNT(CASE WHEN status = 'active' THEN 1 END) AS active
    FROM clients
    WHERE tenant_id = ?
"#;

// MySQL returns DECIMAL for SUM over integers, so the result is cast back
const TOTAL_VIEWS_SQLITE: &str =
    "SELECT COALESCE(SUM(view_count), 0) AS total FROM articles WHERE tenant_id = ?";
const TOTAL_VIEWS_MYSQL: &str =
    "SELECT CAST(COALESCE(SUM(view_count), 0) AS SIGNED) AS total FROM articles WHERE tenant_id = ?";

const SEO_TOTALS_SQLITE: &str =
    "SELECT COALESCE(SUM(seo_score), 0) AS total, COUNT(*) AS count FROM articles WHERE tenant_id = ?";
const SEO_TOTALS_MYSQL: &str =
    "SELECT CAST(COALESCE(SUM(seo_score), 0) AS SIGNED) AS total, COUNT(*) AS count FROM articles WHERE tenant_id = ?";

const TOP_ARTICLES: &str = r#"
    SELECT id, slug, title, status, view_count, like_count, comment_count
    FROM articles
    WHERE tenant_id = ?
    ORDER BY view_count DESC, id ASC
    LIMIT ?
"#;

const DAILY_VIEWS: &str = r#"
    SELECT DATE(occurred_at) AS day, COUNT(*) AS views
    FROM analytics
    WHERE tenant_id = ? AND occurred_at >= ?
    GROUP BY DATE(occurred_at)
    ORDER BY day
"#;

const CLIENT_BREAKDOWN: &str = r#"
    SELECT t.id AS tier_id, COALESCE(t.name, 'No tier') AS tier_name, COUNT(c.id) AS client_count
    FROM clients c
    LEFT JOIN subscription_tiers t ON t.id = c.tier_id
    WHERE c.tenant_id = ?
    GROUP BY t.id, t.name
    ORDER BY client_count DESC, tier_name
"#;

#[async_trait]
impl AnalyticsRepository for SqlxAnalyticsRepository {
    async fn article_status_counts(&self, tenant_id: i64) -> Result<Vec<StatusCount>> {
        let pairs: Vec<(String, i64)> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(STATUS_COUNTS)
                .bind(tenant_id)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to count articles by status")?
                .iter()
                .map(|row| (row.get("status"), row.get("count")))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(STATUS_COUNTS)
                .bind(tenant_id)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to count articles by status")?
                .iter()
                .map(|row| (row.get("status"), row.get("count")))
                .collect(),
        };

        pairs
            .into_iter()
            .map(|(status, count)| {
                Ok(StatusCount {
                    status: status.parse().map_err(anyhow::Error::msg)?,
                    count,
                })
            })
            .collect()
    }

    async fn client_counts(&self, tenant_id: i64) -> Result<(i64, i64)> {
        let counts = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(CLIENT_COUNTS)
                    .bind(tenant_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to count clients")?;
                (row.get("total"), row.get("active"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(CLIENT_COUNTS)
                    .bind(tenant_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to count clients")?;
                (row.get("total"), row.get("active"))
            }
        };
        Ok(counts)
    }

    async fn total_views(&self, tenant_id: i64) -> Result<i64> {
        let total = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(TOTAL_VIEWS_SQLITE)
                .bind(tenant_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to sum views")?
                .get("total"),
            DatabaseDriver::Mysql => sqlx::query(TOTAL_VIEWS_MYSQL)
                .bind(tenant_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to sum views")?
                .get("total"),
        };
        Ok(total)
    }

    async fn seo_score_totals(&self, tenant_id: i64) -> Result<(i64, i64)> {
        let totals = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SEO_TOTALS_SQLITE)
                    .bind(tenant_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to sum SEO scores")?;
                (row.get("total"), row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SEO_TOTALS_MYSQL)
                    .bind(tenant_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to sum SEO scores")?;
                (row.get("total"), row.get("count"))
            }
        };
        Ok(totals)
    }

    async fn count_between(
        &self,
        tenant_id: i64,
        metric: TrendMetric,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64> {
        let (table, column) = metric.source();
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {table} WHERE tenant_id = ? AND {column} >= ? AND {column} < ?",
            table = table,
            column = column
        );
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(from)
                .bind(to)
                .fetch_one(self.pool.sqlite()?)
                .await
                .with_context(|| format!("Failed to count {} in window", table))?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(from)
                .bind(to)
                .fetch_one(self.pool.mysql()?)
                .await
                .with_context(|| format!("Failed to count {} in window", table))?
                .get("count"),
        };
        Ok(count)
    }

    async fn top_articles(&self, tenant_id: i64, limit: i64) -> Result<Vec<TopArticle>> {
        let rows: Vec<(i64, String, String, String, i64, i64, i64)> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(TOP_ARTICLES)
                .bind(tenant_id)
                .bind(limit)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to load top articles")?
                .iter()
                .map(|row| {
                    (
                        row.get("id"),
                        row.get("slug"),
                        row.get("title"),
                        row.get("status"),
                        row.get("view_count"),
                        row.get("like_count"),
                        row.get("comment_count"),
                    )
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(TOP_ARTICLES)
                .bind(tenant_id)
                .bind(limit)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to load top articles")?
                .iter()
                .map(|row| {
                    (
                        row.get("id"),
                        row.get("slug"),
                        row.get("title"),
                        row.get("status"),
                        row.get("view_count"),
                        row.get("like_count"),
                        row.get("comment_count"),
                    )
                })
                .collect(),
        };

        rows.into_iter()
            .map(|(id, slug, title, status, view_count, like_count, comment_count)| {
                Ok(TopArticle {
                    id,
                    slug,
                    title,
                    status: status.parse().map_err(anyhow::Error::msg)?,
                    view_count,
                    like_count,
                    comment_count,
                })
            })
            .collect()
    }

    async fn daily_views_since(&self, tenant_id: i64, since: DateTime<Utc>) -> Result<Vec<DailyViews>> {
        let days = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DAILY_VIEWS)
                .bind(tenant_id)
                .bind(since)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to count daily views")?
                .iter()
                .map(|row| DailyViews {
                    date: row.get("day"),
                    views: row.get("views"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(DAILY_VIEWS)
                .bind(tenant_id)
                .bind(since)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to count daily views")?
                .iter()
                .map(|row| DailyViews {
                    date: row.get("day"),
                    views: row.get("views"),
                })
                .collect(),
        };
        Ok(days)
    }

    async fn client_breakdown(&self, tenant_id: i64) -> Result<Vec<TierBreakdown>> {
        let breakdown = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(CLIENT_BREAKDOWN)
                .bind(tenant_id)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to group clients by tier")?
                .iter()
                .map(|row| TierBreakdown {
                    tier_id: row.get("tier_id"),
                    tier_name: row.get("tier_name"),
                    client_count: row.get("client_count"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(CLIENT_BREAKDOWN)
                .bind(tenant_id)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to group clients by tier")?
                .iter()
                .map(|row| TierBreakdown {
                    tier_id: row.get("tier_id"),
                    tier_name: row.get("tier_name"),
                    client_count: row.get("client_count"),
                })
                .collect(),
        };
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ArticleStatus;
    use chrono::Duration;

    async fn setup() -> (DynDatabasePool, SqlxAnalyticsRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (pool.clone(), SqlxAnalyticsRepository::new(pool))
    }

    async fn insert_article(pool: &DynDatabasePool, slug: &str, status: &str, views: i64, seo: i64, created_at: DateTime<Utc>) {
        sqlx::query("INSERT INTO articles (tenant_id, slug, title, content, content_html, status, view_count, seo_score, created_at, updated_at) VALUES (1, ?, ?, 'x', 'x', ?, ?, ?, ?, ?)")
            .bind(slug)
            .bind(slug)
            .bind(status)
            .bind(views)
            .bind(seo)
            .bind(created_at)
            .bind(created_at)
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_tenant_returns_zeroes() {
        let (_pool, repo) = setup().await;
        assert!(repo.article_status_counts(1).await.unwrap().is_empty());
        assert_eq!(repo.client_counts(1).await.unwrap(), (0, 0));
        assert_eq!(repo.total_views(1).await.unwrap(), 0);
        assert_eq!(repo.seo_score_totals(1).await.unwrap(), (0, 0));
        assert!(repo.top_articles(1, 5).await.unwrap().is_empty());
        assert!(repo.client_breakdown(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_article_aggregates() {
        let (pool, repo) = setup().await;
        let now = Utc::now();
        insert_article(&pool, "a", "published", 30, 80, now).await;
        insert_article(&pool, "b", "published", 5, 40, now).await;
        insert_article(&pool, "c", "draft", 0, 30, now).await;

        let counts = repo.article_status_counts(1).await.unwrap();
        let published = counts.iter().find(|c| c.status == ArticleStatus::Published).unwrap();
        assert_eq!(published.count, 2);

        assert_eq!(repo.total_views(1).await.unwrap(), 35);
        assert_eq!(repo.seo_score_totals(1).await.unwrap(), (150, 3));

        let top = repo.top_articles(1, 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].slug, "a");
        assert_eq!(top[1].slug, "b");
    }

    #[tokio::test]
    async fn test_count_between_windows() {
        let (pool, repo) = setup().await;
        let now = Utc::now();
        insert_article(&pool, "recent", "draft", 0, 0, now - Duration::days(2)).await;
        insert_article(&pool, "older", "draft", 0, 0, now - Duration::days(40)).await;
        insert_article(&pool, "ancient", "draft", 0, 0, now - Duration::days(90)).await;

        let current = repo
            .count_between(1, TrendMetric::Articles, now - Duration::days(30), now)
            .await
            .unwrap();
        let previous = repo
            .count_between(1, TrendMetric::Articles, now - Duration::days(60), now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!((current, previous), (1, 1));

        let views = repo
            .count_between(1, TrendMetric::Views, now - Duration::days(30), now)
            .await
            .unwrap();
        assert_eq!(views, 0);
    }

    #[tokio::test]
    async fn test_client_breakdown_includes_no_tier() {
        let (pool, repo) = setup().await;
        let sqlite = pool.as_sqlite().unwrap();
        for (name, status, tier) in [("A", "active", Some(1)), ("B", "paused", Some(1)), ("C", "active", None)] {
            sqlx::query("INSERT INTO clients (tenant_id, name, status, tier_id) VALUES (1, ?, ?, ?)")
                .bind(name)
                .bind(status)
                .bind(tier)
                .execute(sqlite)
                .await
                .unwrap();
        }

        assert_eq!(repo.client_counts(1).await.unwrap(), (3, 2));

        let breakdown = repo.client_breakdown(1).await.unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].tier_id, Some(1));
        assert_eq!(breakdown[0].client_count, 2);
        assert_eq!(breakdown[1].tier_id, None);
        assert_eq!(breakdown[1].tier_name, "No tier");
    }

    #[tokio::test]
    async fn test_daily_views_grouped_by_day() {
        let (pool, repo) = setup().await;
        let now = Utc::now();
        insert_article(&pool, "a", "published", 0, 0, now).await;
        for days in [1, 1, 3, 45] {
            sqlx::query("INSERT INTO analytics (tenant_id, article_id, occurred_at) VALUES (1, 1, ?)")
                .bind(now - Duration::days(days))
                .execute(pool.as_sqlite().unwrap())
                .await
                .unwrap();
        }

        let days = repo.daily_views_since(1, now - Duration::days(7)).await.unwrap();
        assert_eq!(
            days,
            vec![
                DailyViews {
                    date: (now - Duration::days(3)).date_naive(),
                    views: 1,
                },
                DailyViews {
                    date: (now - Duration::days(1)).date_naive(),
                    views: 2,
                },
            ]
        );
        assert!(repo.daily_views_since(2, now - Duration::days(7)).await.unwrap().is_empty());
    }
}
