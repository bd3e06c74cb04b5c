//! Analytics and dashboard models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ArticleStatus;

/// Headline numbers for the admin dashboard
///
/// Trends compare the current window of `window_days` days against the one
/// before it, in percent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_articles: i64,
    pub published_articles: i64,
    pub draft_articles: i64,
    pub scheduled_articles: i64,
    pub total_clients: i64,
    pub active_clients: i64,
    pub total_subscribers: i64,
    pub total_views: i64,
    /// Mean SEO score over all articles, 0 when there are none
    pub average_seo_score: f64,
    pub articles_trend: f64,
    pub clients_trend: f64,
    pub subscribers_trend: f64,
    pub views_trend: f64,
    pub window_days: u32,
}

/// Counts of one record type in the current and the previous window
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowCount {
    pub current: i64,
    pub previous: i64,
}

/// Number of articles in one status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: ArticleStatus,
    pub count: i64,
}

/// Most viewed articles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopArticle {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: ArticleStatus,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Views on a single day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyViews {
    pub date: NaiveDate,
    pub views: i64,
}

/// Clients per subscription tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierBreakdown {
    /// None for clients without a tier
    pub tier_id: Option<i64>,
    pub tier_name: String,
    pub client_count: i64,
}
