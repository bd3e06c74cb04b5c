//! Dashboard service
//!
//! Aggregates tenant statistics for the admin dashboard. The headline stats
//! are a fan-out of independent queries joined concurrently, cached per
//! tenant until the next write or TTL expiry.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::cache::{tenant_key, CacheLayer, MemoryCache};
use crate::db::repositories::{AnalyticsRepository, SubscriberRepository, TrendMetric};
use crate::models::{
    ArticleStatus, DailyViews, DashboardStats, StatusCount, SubscriberStatus, TierBreakdown, TopArticle,
    WindowCount,
};
use crate::services::{ServiceError, ServiceResult};

const CACHE_KEY_STATS: &str = "dashboard:stats";
const MAX_TOP_ARTICLES: i64 = 50;
const MAX_SERIES_DAYS: u32 = 365;

/// Percentage change from `previous` to `current`
///
/// Growth from nothing counts as 100%; no activity in either window is 0%.
pub fn calculate_trend(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    (current - previous) as f64 / previous as f64 * 100.0
}

impl WindowCount {
    pub fn trend(&self) -> f64 {
        calculate_trend(self.current, self.previous)
    }
}

pub struct DashboardService {
    repo: Arc<dyn AnalyticsRepository>,
    subscriber_repo: Arc<dyn SubscriberRepository>,
    cache: Arc<MemoryCache>,
    window_days: u32,
}

impl DashboardService {
    pub fn new(
        repo: Arc<dyn AnalyticsRepository>,
        subscriber_repo: Arc<dyn SubscriberRepository>,
        cache: Arc<MemoryCache>,
        window_days: u32,
    ) -> Self {
        Self {
            repo,
            subscriber_repo,
            cache,
            window_days: window_days.max(1),
        }
    }

    /// Headline stats with trends over the configured window
    pub async fn get_stats(&self, tenant_id: i64) -> ServiceResult<DashboardStats> {
        let cache_key = tenant_key(tenant_id, CACHE_KEY_STATS);
        if let Ok(Some(stats)) = self.cache.get::<DashboardStats>(&cache_key).await {
            return Ok(stats);
        }

        let now = Utc::now();
        let (
            status_counts,
            (total_clients, active_clients),
            total_subscribers,
            total_views,
            (seo_sum, seo_count),
            articles,
            clients,
            subscribers,
            views,
        ) = tokio::try_join!(
            self.repo.article_status_counts(tenant_id),
            self.repo.client_counts(tenant_id),
            self.subscriber_repo.count(tenant_id, Some(SubscriberStatus::Subscribed)),
            self.repo.total_views(tenant_id),
            self.repo.seo_score_totals(tenant_id),
            self.window_count(tenant_id, TrendMetric::Articles, now),
            self.window_count(tenant_id, TrendMetric::Clients, now),
            self.window_count(tenant_id, TrendMetric::Subscribers, now),
            self.window_count(tenant_id, TrendMetric::Views, now),
        )
        .context("Failed to load dashboard stats")?;

        let count_of = |status: ArticleStatus| {
            status_counts
                .iter()
                .find(|c| c.status == status)
                .map_or(0, |c| c.count)
        };

        let stats = DashboardStats {
            total_articles: status_counts.iter().map(|c| c.count).sum(),
            published_articles: count_of(ArticleStatus::Published),
            draft_articles: count_of(ArticleStatus::Draft),
            scheduled_articles: count_of(ArticleStatus::Scheduled),
            total_clients,
            active_clients,
            total_subscribers,
            total_views,
            average_seo_score: if seo_count > 0 {
                seo_sum as f64 / seo_count as f64
            } else {
                0.0
            },
            articles_trend: articles.trend(),
            clients_trend: clients.trend(),
            subscribers_trend: subscribers.trend(),
            views_trend: views.trend(),
            window_days: self.window_days,
        };

        if let Err(e) = self.cache.set(&cache_key, &stats, self.cache.default_ttl()).await {
            tracing::warn!("Failed to cache dashboard stats for tenant {}: {}", tenant_id, e);
        }
        Ok(stats)
    }

    /// Stats for display: a failed read is logged and shown as zeros
    pub async fn stats_or_default(&self, tenant_id: i64) -> DashboardStats {
        match self.get_stats(tenant_id).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Dashboard stats unavailable for tenant {}: {}", tenant_id, e);
                DashboardStats {
                    window_days: self.window_days,
                    ..Default::default()
                }
            }
        }
    }

    /// Counts for every status, zero included
    pub async fn articles_by_status(&self, tenant_id: i64) -> ServiceResult<Vec<StatusCount>> {
        let counts = self
            .repo
            .article_status_counts(tenant_id)
            .await
            .context("Failed to count articles by status")?;
        Ok(ArticleStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts
                    .iter()
                    .find(|c| c.status == *status)
                    .map_or(0, |c| c.count),
            })
            .collect())
    }

    pub async fn top_articles(&self, tenant_id: i64, limit: i64) -> ServiceResult<Vec<TopArticle>> {
        if limit < 1 {
            return Err(ServiceError::validation("Limit must be at least 1"));
        }
        Ok(self
            .repo
            .top_articles(tenant_id, limit.min(MAX_TOP_ARTICLES))
            .await
            .context("Failed to load top articles")?)
    }

    /// Daily views for the last `days` days ending today, oldest first
    pub async fn views_over_time(&self, tenant_id: i64, days: u32) -> ServiceResult<Vec<DailyViews>> {
        if days == 0 || days > MAX_SERIES_DAYS {
            return Err(ServiceError::validation(format!(
                "Days must be between 1 and {}",
                MAX_SERIES_DAYS
            )));
        }

        let today = Utc::now().date_naive();
        let first = today - Duration::days(i64::from(days) - 1);
        let since = first
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| ServiceError::validation("Invalid date range"))?;

        let counted = self
            .repo
            .daily_views_since(tenant_id, since)
            .await
            .context("Failed to load view history")?;
        Ok(daily_series(first, today, &counted))
    }

    pub async fn client_breakdown(&self, tenant_id: i64) -> ServiceResult<Vec<TierBreakdown>> {
        Ok(self
            .repo
            .client_breakdown(tenant_id)
            .await
            .context("Failed to load client breakdown")?)
    }

    /// Counts in `[now - window, now)` and the window before it
    async fn window_count(
        &self,
        tenant_id: i64,
        metric: TrendMetric,
        now: DateTime<Utc>,
    ) -> anyhow::Result<WindowCount> {
        let window = Duration::days(i64::from(self.window_days));
        let start = now
            .checked_sub_signed(window)
            .context("Trend window reaches before the earliest representable date")?;
        let previous_start = start
            .checked_sub_signed(window)
            .context("Trend window reaches before the earliest representable date")?;
        let (current, previous) = tokio::try_join!(
            self.repo.count_between(tenant_id, metric, start, now),
            self.repo.count_between(tenant_id, metric, previous_start, start),
        )?;
        Ok(WindowCount { current, previous })
    }
}

/// Every day from `first` to `last` inclusive, zero where nothing was counted
fn daily_series(first: NaiveDate, last: NaiveDate, counted: &[DailyViews]) -> Vec<DailyViews> {
    let mut buckets: BTreeMap<NaiveDate, i64> = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| (day, 0))
        .collect();
    for day in counted {
        if let Some(views) = buckets.get_mut(&day.date) {
            *views += day.views;
        }
    }
    buckets
        .into_iter()
        .map(|(date, views)| DailyViews { date, views })
        .collect()
}
