//! Engagement repository: likes and favorites
//!
//! Likes keep `articles.like_count` in step inside the same transaction, so
//! toggling twice always restores the original count.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ArticleSummary, FavoriteResult, LikeResult, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Engagement repository trait
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Like the article, or remove an existing like
    async fn toggle_like(&self, article_id: i64, user_id: i64) -> Result<LikeResult>;

    /// Whether the user likes the article
    async fn is_liked(&self, article_id: i64, user_id: i64) -> Result<bool>;

    /// Favorite the article, or remove an existing favorite
    async fn toggle_favorite(&self, article_id: i64, user_id: i64) -> Result<FavoriteResult>;

    /// Published articles a user has favorited, most recent first, with the total
    async fn list_favorites(&self, user_id: i64, params: &ListParams) -> Result<(Vec<ArticleSummary>, i64)>;
}

/// SQLx-based engagement repository implementation
pub struct SqlxEngagementRepository {
    pool: DynDatabasePool,
}

impl SqlxEngagementRepository {
    /// Create a new SQLx engagement repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EngagementRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_LIKE: &str = "SELECT COUNT(*) AS count FROM article_likes WHERE article_id = ? AND user_id = ?";
const INSERT_LIKE: &str = "INSERT INTO article_likes (article_id, user_id, created_at) VALUES (?, ?, ?)";
const DELETE_LIKE: &str = "DELETE FROM article_likes WHERE article_id = ? AND user_id = ?";
const INCREMENT_LIKES: &str = "UPDATE articles SET like_count = like_count + 1 WHERE id = ?";
const SELECT_LIKE_COUNT: &str = "SELECT like_count FROM articles WHERE id = ?";

const DELETE_FAVORITE: &str = "DELETE FROM favorites WHERE article_id = ? AND user_id = ?";
const INSERT_FAVORITE: &str = "INSERT INTO favorites (article_id, user_id, created_at) VALUES (?, ?, ?)";

const LIST_FAVORITES: &str = r#"
    SELECT a.id, a.slug, a.title, a.excerpt, a.featured_image, a.published_at
    FROM favorites f
    INNER JOIN articles a ON a.id = f.article_id
    WHERE f.user_id = ? AND a.status = 'published'
    ORDER BY f.created_at DESC, a.id DESC
    LIMIT ? OFFSET ?
"#;

const COUNT_FAVORITES: &str = r#"
    SELECT COUNT(*) AS count
    FROM favorites f
    INNER JOIN articles a ON a.id = f.article_id
    WHERE f.user_id = ? AND a.status = 'published'
"#;

#[async_trait]
impl EngagementRepository for SqlxEngagementRepository {
    async fn toggle_like(&self, article_id: i64, user_id: i64) -> Result<LikeResult> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => toggle_like_sqlite(self.pool.sqlite()?, article_id, user_id).await,
            DatabaseDriver::Mysql => toggle_like_mysql(self.pool.mysql()?, article_id, user_id).await,
        }
    }

    async fn is_liked(&self, article_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(SELECT_LIKE)
                .bind(article_id)
                .bind(user_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check like")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(SELECT_LIKE)
                .bind(article_id)
                .bind(user_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check like")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn toggle_favorite(&self, article_id: i64, user_id: i64) -> Result<FavoriteResult> {
        let now = Utc::now();
        let favorited = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let removed = sqlx::query(DELETE_FAVORITE)
                    .bind(article_id)
                    .bind(user_id)
                    .execute(pool)
                    .await
                    .context("Failed to remove favorite")?
                    .rows_affected();
                if removed == 0 {
                    sqlx::query(INSERT_FAVORITE)
                        .bind(article_id)
                        .bind(user_id)
                        .bind(now)
                        .execute(pool)
                        .await
                        .context("Failed to add favorite")?;
                }
                removed == 0
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let removed = sqlx::query(DELETE_FAVORITE)
                    .bind(article_id)
                    .bind(user_id)
                    .execute(pool)
                    .await
                    .context("Failed to remove favorite")?
                    .rows_affected();
                if removed == 0 {
                    sqlx::query(INSERT_FAVORITE)
                        .bind(article_id)
                        .bind(user_id)
                        .bind(now)
                        .execute(pool)
                        .await
                        .context("Failed to add favorite")?;
                }
                removed == 0
            }
        };
        Ok(FavoriteResult { favorited })
    }

    async fn list_favorites(&self, user_id: i64, params: &ListParams) -> Result<(Vec<ArticleSummary>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let total: i64 = sqlx::query(COUNT_FAVORITES)
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count favorites")?
                    .get("count");
                let rows = sqlx::query(LIST_FAVORITES)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list favorites")?;
                let items = rows
                    .iter()
                    .map(|row| ArticleSummary {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        title: row.get("title"),
                        excerpt: row.get("excerpt"),
                        featured_image: row.get("featured_image"),
                        published_at: row.get("published_at"),
                    })
                    .collect();
                Ok((items, total))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let total: i64 = sqlx::query(COUNT_FAVORITES)
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count favorites")?
                    .get("count");
                let rows = sqlx::query(LIST_FAVORITES)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list favorites")?;
                let items = rows
                    .iter()
                    .map(|row| ArticleSummary {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        title: row.get("title"),
                        excerpt: row.get("excerpt"),
                        featured_image: row.get("featured_image"),
                        published_at: row.get("published_at"),
                    })
                    .collect();
                Ok((items, total))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn toggle_like_sqlite(pool: &SqlitePool, article_id: i64, user_id: i64) -> Result<LikeResult> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let removed = sqlx::query(DELETE_LIKE)
        .bind(article_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to remove like")?
        .rows_affected();

    if removed > 0 {
        sqlx::query("UPDATE articles SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement like count")?;
    } else {
        sqlx::query(INSERT_LIKE)
            .bind(article_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .context("Failed to add like")?;
        sqlx::query(INCREMENT_LIKES)
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment like count")?;
    }

    let like_count: i64 = sqlx::query(SELECT_LIKE_COUNT)
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read like count")?
        .get("like_count");

    tx.commit().await.context("Failed to commit like")?;

    Ok(LikeResult {
        liked: removed == 0,
        like_count,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn toggle_like_mysql(pool: &MySqlPool, article_id: i64, user_id: i64) -> Result<LikeResult> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let removed = sqlx::query(DELETE_LIKE)
        .bind(article_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to remove like")?
        .rows_affected();

    if removed > 0 {
        sqlx::query("UPDATE articles SET like_count = GREATEST(like_count - 1, 0) WHERE id = ?")
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement like count")?;
    } else {
        sqlx::query(INSERT_LIKE)
            .bind(article_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .context("Failed to add like")?;
        sqlx::query(INCREMENT_LIKES)
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment like count")?;
    }

    let like_count: i64 = sqlx::query(SELECT_LIKE_COUNT)
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read like count")?
        .get("like_count");

    tx.commit().await.context("Failed to commit like")?;

    Ok(LikeResult {
        liked: removed == 0,
        like_count,
    })
}
