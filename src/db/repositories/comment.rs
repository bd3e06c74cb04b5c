//! Comment repository
//!
//! This module provides:
//! - `CommentRepository` trait defining the interface for comment data access
//! - `SqlxCommentRepository` implementing the trait for SQLite and MySQL
//!
//! `articles.comment_count` is derived data; callers refresh it with
//! `recompute_comment_count` after any change that can affect it.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentStatus, ListParams, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Comment>>;

    /// Comments of an article with their authors, oldest first
    async fn list_for_article(&self, article_id: i64, status: Option<CommentStatus>) -> Result<Vec<(Comment, UserSummary)>>;

    /// Moderation queue, newest first, with the total
    async fn list(&self, tenant_id: i64, status: Option<CommentStatus>, params: &ListParams) -> Result<(Vec<Comment>, i64)>;

    /// Change the moderation status
    async fn update_status(&self, tenant_id: i64, id: i64, status: CommentStatus) -> Result<bool>;

    /// Delete a comment; replies go with it
    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool>;

    /// Store the number of approved comments on the article and return it
    async fn recompute_comment_count(&self, article_id: i64) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (tenant_id, article_id, user_id, parent_id, content, status, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_COMMENT: &str = r#"
    SELECT id, tenant_id, article_id, user_id, parent_id, content, status, created_at, updated_at
    FROM comments
    WHERE tenant_id = ? AND id = ?
"#;

const LIST_ARTICLE_COMMENTS: &str = r#"
    SELECT c.id, c.tenant_id, c.article_id, c.user_id, c.parent_id, c.content, c.status,
           c.created_at, c.updated_at, u.username, u.display_name, u.avatar
    FROM comments c
    INNER JOIN users u ON u.id = c.user_id
    WHERE c.article_id = ? AND (? IS NULL OR c.status = ?)
    ORDER BY c.created_at ASC, c.id ASC
"#;

const LIST_COMMENTS: &str = r#"
    SELECT id, tenant_id, article_id, user_id, parent_id, content, status, created_at, updated_at
    FROM comments
    WHERE tenant_id = ? AND (? IS NULL OR status = ?)
    ORDER BY created_at DESC, id DESC
    LIMIT ? OFFSET ?
"#;

const COUNT_COMMENTS: &str =
    "SELECT COUNT(*) AS count FROM comments WHERE tenant_id = ? AND (? IS NULL OR status = ?)";

const UPDATE_STATUS: &str = "UPDATE comments SET status = ?, updated_at = ? WHERE tenant_id = ? AND id = ?";

const DELETE_COMMENT: &str = "DELETE FROM comments WHERE tenant_id = ? AND id = ?";

const RECOMPUTE_COUNT: &str = r#"
    UPDATE articles
    SET comment_count = (SELECT COUNT(*) FROM comments WHERE article_id = ? AND status = 'approved')
    WHERE id = ?
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_COMMENT)
                .bind(comment.tenant_id)
                .bind(comment.article_id)
                .bind(comment.user_id)
                .bind(comment.parent_id)
                .bind(&comment.content)
                .bind(comment.status.as_str())
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_COMMENT)
                .bind(comment.tenant_id)
                .bind(comment.article_id)
                .bind(comment.user_id)
                .bind(comment.parent_id)
                .bind(&comment.content)
                .bind(comment.status.as_str())
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            created_at: now,
            updated_at: now,
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(SELECT_COMMENT)
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get comment")?
                .as_ref()
                .map(row_to_comment_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(SELECT_COMMENT)
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get comment")?
                .as_ref()
                .map(row_to_comment_mysql)
                .transpose(),
        }
    }

    async fn list_for_article(&self, article_id: i64, status: Option<CommentStatus>) -> Result<Vec<(Comment, UserSummary)>> {
        let status = status.map(|s| s.as_str());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_ARTICLE_COMMENTS)
                    .bind(article_id)
                    .bind(status)
                    .bind(status)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list article comments")?;
                rows.iter()
                    .map(|row| {
                        let comment = row_to_comment_sqlite(row)?;
                        let author = UserSummary {
                            id: comment.user_id,
                            username: row.get("username"),
                            display_name: row.get("display_name"),
                            avatar: row.get("avatar"),
                        };
                        Ok((comment, author))
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_ARTICLE_COMMENTS)
                    .bind(article_id)
                    .bind(status)
                    .bind(status)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list article comments")?;
                rows.iter()
                    .map(|row| {
                        let comment = row_to_comment_mysql(row)?;
                        let author = UserSummary {
                            id: comment.user_id,
                            username: row.get("username"),
                            display_name: row.get("display_name"),
                            avatar: row.get("avatar"),
                        };
                        Ok((comment, author))
                    })
                    .collect()
            }
        }
    }

    async fn list(&self, tenant_id: i64, status: Option<CommentStatus>, params: &ListParams) -> Result<(Vec<Comment>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_comments_sqlite(self.pool.sqlite()?, tenant_id, status, params).await,
            DatabaseDriver::Mysql => list_comments_mysql(self.pool.mysql()?, tenant_id, status, params).await,
        }
    }

    async fn update_status(&self, tenant_id: i64, id: i64, status: CommentStatus) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UPDATE_STATUS)
                .bind(status.as_str())
                .bind(now)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update comment status")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(UPDATE_STATUS)
                .bind(status.as_str())
                .bind(now)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update comment status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_COMMENT)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(DELETE_COMMENT)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn recompute_comment_count(&self, article_id: i64) -> Result<i64> {
        let select = "SELECT comment_count FROM articles WHERE id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                sqlx::query(RECOMPUTE_COUNT)
                    .bind(article_id)
                    .bind(article_id)
                    .execute(pool)
                    .await
                    .context("Failed to recompute comment count")?;
                sqlx::query(select)
                    .bind(article_id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to read comment count")?
                    .map(|row| row.get("comment_count"))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                sqlx::query(RECOMPUTE_COUNT)
                    .bind(article_id)
                    .bind(article_id)
                    .execute(pool)
                    .await
                    .context("Failed to recompute comment count")?;
                sqlx::query(select)
                    .bind(article_id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to read comment count")?
                    .map(|row| row.get("comment_count"))
            }
        };
        Ok(count.unwrap_or(0))
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_comments_sqlite(
    pool: &SqlitePool,
    tenant_id: i64,
    status: Option<CommentStatus>,
    params: &ListParams,
) -> Result<(Vec<Comment>, i64)> {
    let status = status.map(|s| s.as_str());

    let total: i64 = sqlx::query(COUNT_COMMENTS)
        .bind(tenant_id)
        .bind(status)
        .bind(status)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?
        .get("count");

    let rows = sqlx::query(LIST_COMMENTS)
        .bind(tenant_id)
        .bind(status)
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let comments = rows.iter().map(row_to_comment_sqlite).collect::<Result<Vec<_>>>()?;
    Ok((comments, total))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    let status: String = row.get("status");
    Ok(Comment {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        article_id: row.get("article_id"),
        user_id: row.get("user_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        status: status.parse().map_err(anyhow::Error::msg)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_comments_mysql(
    pool: &MySqlPool,
    tenant_id: i64,
    status: Option<CommentStatus>,
    params: &ListParams,
) -> Result<(Vec<Comment>, i64)> {
    let status = status.map(|s| s.as_str());

    let total: i64 = sqlx::query(COUNT_COMMENTS)
        .bind(tenant_id)
        .bind(status)
        .bind(status)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?
        .get("count");

    let rows = sqlx::query(LIST_COMMENTS)
        .bind(tenant_id)
        .bind(status)
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    let comments = rows.iter().map(row_to_comment_mysql).collect::<Result<Vec<_>>>()?;
    Ok((comments, total))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    let status: String = row.get("status");
    Ok(Comment {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        article_id: row.get("article_id"),
        user_id: row.get("user_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        status: status.parse().map_err(anyhow::Error::msg)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite = pool.as_sqlite().unwrap();
        let now = Utc::now();
        sqlx::query("INSERT INTO users (tenant_id, username, email, display_name) VALUES (1, 'ada', 'ada@example.com', 'Ada')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO articles (tenant_id, slug, title, content, content_html, status, created_at, updated_at) VALUES (1, 'post', 'Post', 'x', 'x', 'published', ?, ?)")
            .bind(now)
            .bind(now)
            .execute(sqlite)
            .await
            .unwrap();

        (pool.clone(), SqlxCommentRepository::new(pool))
    }

    fn new_comment(status: CommentStatus, parent_id: Option<i64>) -> Comment {
        let now = Utc::now();
        Comment {
            id: 0,
            tenant_id: 1,
            article_id: 1,
            user_id: 1,
            parent_id,
            content: "Nice post".to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_with_author() {
        let (_pool, repo) = setup().await;
        let root = repo.create(&new_comment(CommentStatus::Approved, None)).await.unwrap();
        repo.create(&new_comment(CommentStatus::Approved, Some(root.id))).await.unwrap();
        repo.create(&new_comment(CommentStatus::Pending, None)).await.unwrap();

        let approved = repo.list_for_article(1, Some(CommentStatus::Approved)).await.unwrap();
        assert_eq!(approved.len(), 2);
        assert_eq!(approved[0].1.username, "ada");
        assert_eq!(approved[0].1.display_name.as_deref(), Some("Ada"));
        assert_eq!(approved[1].0.parent_id, Some(root.id));

        assert_eq!(repo.list_for_article(1, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_moderation_queue() {
        let (_pool, repo) = setup().await;
        let pending = repo.create(&new_comment(CommentStatus::Pending, None)).await.unwrap();
        repo.create(&new_comment(CommentStatus::Approved, None)).await.unwrap();

        let (queue, total) = repo
            .list(1, Some(CommentStatus::Pending), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(queue[0].id, pending.id);

        assert!(repo.update_status(1, pending.id, CommentStatus::Spam).await.unwrap());
        let stored = repo.get_by_id(1, pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CommentStatus::Spam);
        assert!(!repo.update_status(2, pending.id, CommentStatus::Approved).await.unwrap());
    }

    #[tokio::test]
    async fn test_recompute_counts_only_approved() {
        let (_pool, repo) = setup().await;
        let root = repo.create(&new_comment(CommentStatus::Approved, None)).await.unwrap();
        repo.create(&new_comment(CommentStatus::Approved, Some(root.id))).await.unwrap();
        repo.create(&new_comment(CommentStatus::Pending, None)).await.unwrap();

        assert_eq!(repo.recompute_comment_count(1).await.unwrap(), 2);

        assert!(repo.delete(1, root.id).await.unwrap());
        assert_eq!(repo.recompute_comment_count(1).await.unwrap(), 0);
        assert_eq!(repo.list_for_article(1, None).await.unwrap().len(), 1);
    }
}
