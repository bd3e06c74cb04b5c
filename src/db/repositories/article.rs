//! Article repository
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL
//!
//! Besides the article rows themselves this repository owns the tables that
//! hang off an article: versions, related links, FAQ links and view events.
//! `delete_cascade` removes all of them together with the article.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    Article, ArticleExportRow, ArticleFilter, ArticleStatus, ArticleSummary, ArticleVersion, ListParams,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, MySqlConnection, MySqlPool, Row, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create a new article
    async fn create(&self, article: &Article) -> Result<Article>;

    /// Get article by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Article>>;

    /// Get article by slug within a tenant
    async fn get_by_slug(&self, tenant_id: i64, slug: &str) -> Result<Option<Article>>;

    /// Check if a slug is taken, optionally ignoring one article
    async fn exists_by_slug(&self, tenant_id: i64, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// List articles, newest first
    async fn list(&self, tenant_id: i64, filter: &ArticleFilter, params: &ListParams) -> Result<Vec<Article>>;

    /// Count articles matching a filter
    async fn count(&self, tenant_id: i64, filter: &ArticleFilter) -> Result<i64>;

    /// Write every mutable column of an article
    async fn update(&self, article: &Article) -> Result<Article>;

    /// Set the status of several articles, returning how many changed.
    /// Moving to published stamps `published_at` when it is still unset.
    async fn bulk_update_status(&self, tenant_id: i64, ids: &[i64], status: ArticleStatus) -> Result<u64>;

    /// Snapshot the versioned fields of an article as its next version
    async fn create_version(&self, article: &Article) -> Result<ArticleVersion>;

    /// List versions of an article, newest first
    async fn list_versions(&self, article_id: i64) -> Result<Vec<ArticleVersion>>;

    /// Get a single version of an article
    async fn get_version(&self, article_id: i64, version_id: i64) -> Result<Option<ArticleVersion>>;

    /// Replace the related articles of an article
    async fn set_related(&self, article_id: i64, related_ids: &[i64]) -> Result<()>;

    /// Related articles, optionally only published ones
    async fn list_related(&self, article_id: i64, published_only: bool) -> Result<Vec<ArticleSummary>>;

    /// Replace the FAQs linked to an article; list order becomes sort order
    async fn set_faqs(&self, article_id: i64, faq_ids: &[i64]) -> Result<()>;

    /// Store a view event and bump the view counter
    async fn record_view(
        &self,
        tenant_id: i64,
        article_id: i64,
        visitor_id: Option<&str>,
        referrer: Option<&str>,
    ) -> Result<()>;

    /// Delete articles and every row referencing them in one transaction.
    /// Ids outside the tenant are ignored. Returns the number of articles deleted.
    async fn delete_cascade(&self, tenant_id: i64, ids: &[i64]) -> Result<u64>;

    /// Rows for the CSV export, newest first
    async fn export_rows(&self, tenant_id: i64, filter: &ArticleFilter) -> Result<Vec<ArticleExportRow>>;

    /// Publish scheduled articles whose time has come.
    /// Returns the ids of the tenants that had articles published.
    async fn publish_due(&self, now: DateTime<Utc>) -> Result<Vec<i64>>;
}

/// SQLx-based article repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

const ARTICLE_COLUMNS: &str = "id, tenant_id, client_id, category_id, author_id, slug, title, excerpt, \
    content, content_html, meta_title, meta_description, focus_keyword, featured_image, \
    featured_image_alt, status, seo_score, view_count, like_count, comment_count, \
    scheduled_at, published_at, created_at, updated_at";

const INSERT_ARTICLE: &str = r#"
    INSERT INTO articles
        (tenant_id, client_id, category_id, author_id, slug, title, excerpt, content, content_html,
         meta_title, meta_description, focus_keyword, featured_image, featured_image_alt,
         status, seo_score, scheduled_at, published_at, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_ARTICLE: &str = r#"
    UPDATE articles
    SET client_id = ?, category_id = ?, author_id = ?, slug = ?, title = ?, excerpt = ?,
        content = ?, content_html = ?, meta_title = ?, meta_description = ?, focus_keyword = ?,
        featured_image = ?, featured_image_alt = ?, status = ?, seo_score = ?,
        scheduled_at = ?, published_at = ?, updated_at = ?
    WHERE tenant_id = ? AND id = ?
"#;

const INSERT_VERSION: &str = r#"
    INSERT INTO article_versions
        (article_id, version_number, title, content, meta_title, meta_description, created_at)
    SELECT ?, COALESCE(MAX(version_number), 0) + 1, ?, ?, ?, ?, ?
    FROM article_versions
    WHERE article_id = ?
"#;

const VERSION_COLUMNS: &str =
    "id, article_id, version_number, title, content, meta_title, meta_description, created_at";

const LIST_RELATED: &str = r#"
    SELECT a.id, a.slug, a.title, a.excerpt, a.featured_image, a.published_at
    FROM related_articles r
    INNER JOIN articles a ON a.id = r.related_article_id
    WHERE r.article_id = ? AND (? = 0 OR a.status = 'published')
    ORDER BY a.title
"#;

const INSERT_VIEW: &str = r#"
    INSERT INTO analytics (tenant_id, article_id, event_type, visitor_id, referrer, occurred_at)
    VALUES (?, ?, 'view', ?, ?, ?)
"#;

const INCREMENT_VIEWS: &str = "UPDATE articles SET view_count = view_count + 1 WHERE id = ?";

/// Child tables keyed by `article_id`, cleared before the article row
/// Articles removed per statement group, keeping the `related_articles`
/// delete (two binds per id) under SQLite's 999 parameter limit
const DELETE_CHUNK: usize = 400;

const CASCADE_TABLES: [&str; 7] = [
    "article_tags",
    "article_versions",
    "article_faqs",
    "analytics",
    "comments",
    "article_likes",
    "favorites",
];

// Articles of clients that are no longer active stay scheduled
const SELECT_DUE_TENANTS: &str = r#"
    SELECT DISTINCT tenant_id FROM articles
    WHERE status = 'scheduled' AND scheduled_at IS NOT NULL AND scheduled_at <= ?
      AND (client_id IS NULL OR client_id IN (SELECT id FROM clients WHERE status = 'active'))
"#;

const PUBLISH_DUE: &str = r#"
    UPDATE articles
    SET status = 'published', published_at = scheduled_at, updated_at = ?
    WHERE status = 'scheduled' AND scheduled_at IS NOT NULL AND scheduled_at <= ?
      AND (client_id IS NULL OR client_id IN (SELECT id FROM clients WHERE status = 'active'))
"#;

/// `WHERE` clause shared by listing, counting and exporting.
/// `prefix` qualifies column names when the query joins other tables.
fn filter_clause(prefix: &str) -> String {
    format!(
        "{p}tenant_id = ? \
         AND (? IS NULL OR {p}status = ?) \
         AND (? IS NULL OR {p}client_id = ?) \
         AND (? IS NULL OR {p}category_id = ?) \
         AND (? IS NULL OR {p}author_id = ?) \
         AND (? IS NULL OR LOWER({p}title) LIKE ?)",
        p = prefix
    )
}

/// `?, ?, ?` for an `IN` list of `count` values
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Bind values shared by the filtered queries
struct FilterBinds {
    status: Option<&'static str>,
    client_id: Option<i64>,
    category_id: Option<i64>,
    author_id: Option<i64>,
    pattern: Option<String>,
}

impl FilterBinds {
    fn new(filter: &ArticleFilter) -> Self {
        Self {
            status: filter.status.map(|s| s.as_str()),
            client_id: filter.client_id,
            category_id: filter.category_id,
            author_id: filter.author_id,
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
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_article_sqlite(self.pool.sqlite()?, article).await,
            DatabaseDriver::Mysql => create_article_mysql(self.pool.mysql()?, article).await,
        }
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE tenant_id = ? AND id = ?", ARTICLE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get article by ID")?
                .as_ref()
                .map(row_to_article_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get article by ID")?
                .as_ref()
                .map(row_to_article_mysql)
                .transpose(),
        }
    }

    async fn get_by_slug(&self, tenant_id: i64, slug: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE tenant_id = ? AND slug = ?", ARTICLE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(slug)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get article by slug")?
                .as_ref()
                .map(row_to_article_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(slug)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get article by slug")?
                .as_ref()
                .map(row_to_article_mysql)
                .transpose(),
        }
    }

    async fn exists_by_slug(&self, tenant_id: i64, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM articles WHERE tenant_id = ? AND slug = ? AND (? IS NULL OR id <> ?)";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(tenant_id)
                .bind(slug)
                .bind(exclude_id)
                .bind(exclude_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check article slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(tenant_id)
                .bind(slug)
                .bind(exclude_id)
                .bind(exclude_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check article slug")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list(&self, tenant_id: i64, filter: &ArticleFilter, params: &ListParams) -> Result<Vec<Article>> {
        let binds = FilterBinds::new(filter);
        let sql = format!(
            "SELECT {} FROM articles WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS,
            filter_clause("")
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_filter_sqlite(sqlx::query(&sql), tenant_id, &binds)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list articles")?;
                rows.iter().map(row_to_article_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_filter_mysql(sqlx::query(&sql), tenant_id, &binds)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list articles")?;
                rows.iter().map(row_to_article_mysql).collect()
            }
        }
    }

    async fn count(&self, tenant_id: i64, filter: &ArticleFilter) -> Result<i64> {
        let binds = FilterBinds::new(filter);
        let sql = format!("SELECT COUNT(*) AS count FROM articles WHERE {}", filter_clause(""));
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_filter_sqlite(sqlx::query(&sql), tenant_id, &binds)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count articles")?
                .get("count"),
            DatabaseDriver::Mysql => bind_filter_mysql(sqlx::query(&sql), tenant_id, &binds)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count articles")?
                .get("count"),
        };
        Ok(count)
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_update_sqlite(sqlx::query(UPDATE_ARTICLE), article, now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update article")?
                .rows_affected(),
            DatabaseDriver::Mysql => bind_update_mysql(sqlx::query(UPDATE_ARTICLE), article, now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update article")?
                .rows_affected(),
        };

        if affected == 0 {
            anyhow::bail!("Article not found: {}", article.id);
        }

        Ok(Article {
            updated_at: now,
            ..article.clone()
        })
    }

    async fn bulk_update_status(&self, tenant_id: i64, ids: &[i64], status: ArticleStatus) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let sql = format!(
            "UPDATE articles \
             SET status = ?, \
                 published_at = CASE WHEN ? = 'published' THEN COALESCE(published_at, ?) ELSE published_at END, \
                 updated_at = ? \
             WHERE tenant_id = ? AND id IN ({})",
            placeholders(ids.len())
        );

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql)
                    .bind(status.as_str())
                    .bind(status.as_str())
                    .bind(now)
                    .bind(now)
                    .bind(tenant_id);
                for id in ids {
                    query = query.bind(*id);
                }
                query
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update article statuses")?
                    .rows_affected()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql)
                    .bind(status.as_str())
                    .bind(status.as_str())
                    .bind(now)
                    .bind(now)
                    .bind(tenant_id);
                for id in ids {
                    query = query.bind(*id);
                }
                query
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update article statuses")?
                    .rows_affected()
            }
        };

        Ok(affected)
    }

    async fn create_version(&self, article: &Article) -> Result<ArticleVersion> {
        let now = Utc::now();
        let select = format!("SELECT {} FROM article_versions WHERE id = ?", VERSION_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let id = sqlx::query(INSERT_VERSION)
                    .bind(article.id)
                    .bind(&article.title)
                    .bind(&article.content)
                    .bind(&article.meta_title)
                    .bind(&article.meta_description)
                    .bind(now)
                    .bind(article.id)
                    .execute(pool)
                    .await
                    .context("Failed to create article version")?
                    .last_insert_rowid();
                let row = sqlx::query(&select)
                    .bind(id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to read article version")?;
                row_to_version_sqlite(&row)
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let id = sqlx::query(INSERT_VERSION)
                    .bind(article.id)
                    .bind(&article.title)
                    .bind(&article.content)
                    .bind(&article.meta_title)
                    .bind(&article.meta_description)
                    .bind(now)
                    .bind(article.id)
                    .execute(pool)
                    .await
                    .context("Failed to create article version")?
                    .last_insert_id() as i64;
                let row = sqlx::query(&select)
                    .bind(id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to read article version")?;
                row_to_version_mysql(&row)
            }
        }
    }

    async fn list_versions(&self, article_id: i64) -> Result<Vec<ArticleVersion>> {
        let sql = format!(
            "SELECT {} FROM article_versions WHERE article_id = ? ORDER BY version_number DESC",
            VERSION_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(article_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list article versions")?;
                rows.iter().map(row_to_version_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(article_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list article versions")?;
                rows.iter().map(row_to_version_mysql).collect()
            }
        }
    }

    async fn get_version(&self, article_id: i64, version_id: i64) -> Result<Option<ArticleVersion>> {
        let sql = format!(
            "SELECT {} FROM article_versions WHERE article_id = ? AND id = ?",
            VERSION_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(article_id)
                .bind(version_id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get article version")?
                .as_ref()
                .map(row_to_version_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(article_id)
                .bind(version_id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get article version")?
                .as_ref()
                .map(row_to_version_mysql)
                .transpose(),
        }
    }

    async fn set_related(&self, article_id: i64, related_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_related_sqlite(self.pool.sqlite()?, article_id, related_ids).await,
            DatabaseDriver::Mysql => set_related_mysql(self.pool.mysql()?, article_id, related_ids).await,
        }
    }

    async fn list_related(&self, article_id: i64, published_only: bool) -> Result<Vec<ArticleSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_RELATED)
                    .bind(article_id)
                    .bind(published_only)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list related articles")?;
                Ok(rows
                    .iter()
                    .map(|row| ArticleSummary {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        title: row.get("title"),
                        excerpt: row.get("excerpt"),
                        featured_image: row.get("featured_image"),
                        published_at: row.get("published_at"),
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_RELATED)
                    .bind(article_id)
                    .bind(published_only)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list related articles")?;
                Ok(rows
                    .iter()
                    .map(|row| ArticleSummary {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        title: row.get("title"),
                        excerpt: row.get("excerpt"),
                        featured_image: row.get("featured_image"),
                        published_at: row.get("published_at"),
                    })
                    .collect())
            }
        }
    }

    async fn set_faqs(&self, article_id: i64, faq_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_faqs_sqlite(self.pool.sqlite()?, article_id, faq_ids).await,
            DatabaseDriver::Mysql => set_faqs_mysql(self.pool.mysql()?, article_id, faq_ids).await,
        }
    }

    async fn record_view(
        &self,
        tenant_id: i64,
        article_id: i64,
        visitor_id: Option<&str>,
        referrer: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut tx = self.pool.sqlite()?.begin().await.context("Failed to begin transaction")?;
                sqlx::query(INSERT_VIEW)
                    .bind(tenant_id)
                    .bind(article_id)
                    .bind(visitor_id)
                    .bind(referrer)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to record view")?;
                sqlx::query(INCREMENT_VIEWS)
                    .bind(article_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to increment view count")?;
                tx.commit().await.context("Failed to commit view")?;
            }
            DatabaseDriver::Mysql => {
                let mut tx = self.pool.mysql()?.begin().await.context("Failed to begin transaction")?;
                sqlx::query(INSERT_VIEW)
                    .bind(tenant_id)
                    .bind(article_id)
                    .bind(visitor_id)
                    .bind(referrer)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to record view")?;
                sqlx::query(INCREMENT_VIEWS)
                    .bind(article_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to increment view count")?;
                tx.commit().await.context("Failed to commit view")?;
            }
        }
        Ok(())
    }

    async fn delete_cascade(&self, tenant_id: i64, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_cascade_sqlite(self.pool.sqlite()?, tenant_id, ids).await,
            DatabaseDriver::Mysql => delete_cascade_mysql(self.pool.mysql()?, tenant_id, ids).await,
        }
    }

    async fn export_rows(&self, tenant_id: i64, filter: &ArticleFilter) -> Result<Vec<ArticleExportRow>> {
        let binds = FilterBinds::new(filter);
        let sql = format!(
            "SELECT a.title, a.status, c.name AS client_name, cat.name AS category_name, \
                    COALESCE(u.display_name, u.username) AS author_name, a.view_count, \
                    a.created_at, a.published_at, a.scheduled_at \
             FROM articles a \
             LEFT JOIN clients c ON c.id = a.client_id \
             LEFT JOIN categories cat ON cat.id = a.category_id \
             LEFT JOIN users u ON u.id = a.author_id \
             WHERE {} \
             ORDER BY a.created_at DESC, a.id DESC",
            filter_clause("a.")
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_filter_sqlite(sqlx::query(&sql), tenant_id, &binds)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to load export rows")?;
                rows.iter()
                    .map(|row| {
                        let status: String = row.get("status");
                        Ok(ArticleExportRow {
                            title: row.get("title"),
                            status: status.parse().map_err(anyhow::Error::msg)?,
                            client_name: row.get("client_name"),
                            category_name: row.get("category_name"),
                            author_name: row.get("author_name"),
                            view_count: row.get("view_count"),
                            created_at: row.get("created_at"),
                            published_at: row.get("published_at"),
                            scheduled_at: row.get("scheduled_at"),
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_filter_mysql(sqlx::query(&sql), tenant_id, &binds)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to load export rows")?;
                rows.iter()
                    .map(|row| {
                        let status: String = row.get("status");
                        Ok(ArticleExportRow {
                            title: row.get("title"),
                            status: status.parse().map_err(anyhow::Error::msg)?,
                            client_name: row.get("client_name"),
                            category_name: row.get("category_name"),
                            author_name: row.get("author_name"),
                            view_count: row.get("view_count"),
                            created_at: row.get("created_at"),
                            published_at: row.get("published_at"),
                            scheduled_at: row.get("scheduled_at"),
                        })
                    })
                    .collect()
            }
        }
    }

    async fn publish_due(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let tenants: Vec<i64> = sqlx::query(SELECT_DUE_TENANTS)
                    .bind(now)
                    .fetch_all(pool)
                    .await
                    .context("Failed to find due articles")?
                    .iter()
                    .map(|row| row.get("tenant_id"))
                    .collect();
                if !tenants.is_empty() {
                    sqlx::query(PUBLISH_DUE)
                        .bind(now)
                        .bind(now)
                        .execute(pool)
                        .await
                        .context("Failed to publish due articles")?;
                }
                Ok(tenants)
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let tenants: Vec<i64> = sqlx::query(SELECT_DUE_TENANTS)
                    .bind(now)
                    .fetch_all(pool)
                    .await
                    .context("Failed to find due articles")?
                    .iter()
                    .map(|row| row.get("tenant_id"))
                    .collect();
                if !tenants.is_empty() {
                    sqlx::query(PUBLISH_DUE)
                        .bind(now)
                        .bind(now)
                        .execute(pool)
                        .await
                        .context("Failed to publish due articles")?;
                }
                Ok(tenants)
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

fn bind_filter_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    tenant_id: i64,
    binds: &FilterBinds,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(tenant_id)
        .bind(binds.status)
        .bind(binds.status)
        .bind(binds.client_id)
        .bind(binds.client_id)
        .bind(binds.category_id)
        .bind(binds.category_id)
        .bind(binds.author_id)
        .bind(binds.author_id)
        .bind(binds.pattern.clone())
        .bind(binds.pattern.clone())
}

fn bind_update_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    article: &Article,
    now: DateTime<Utc>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(article.client_id)
        .bind(article.category_id)
        .bind(article.author_id)
        .bind(article.slug.clone())
        .bind(article.title.clone())
        .bind(article.excerpt.clone())
        .bind(article.content.clone())
        .bind(article.content_html.clone())
        .bind(article.meta_title.clone())
        .bind(article.meta_description.clone())
        .bind(article.focus_keyword.clone())
        .bind(article.featured_image.clone())
        .bind(article.featured_image_alt.clone())
        .bind(article.status.as_str())
        .bind(article.seo_score)
        .bind(article.scheduled_at)
        .bind(article.published_at)
        .bind(now)
        .bind(article.tenant_id)
        .bind(article.id)
}

async fn create_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_ARTICLE)
        .bind(article.tenant_id)
        .bind(article.client_id)
        .bind(article.category_id)
        .bind(article.author_id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.content_html)
        .bind(&article.meta_title)
        .bind(&article.meta_description)
        .bind(&article.focus_keyword)
        .bind(&article.featured_image)
        .bind(&article.featured_image_alt)
        .bind(article.status.as_str())
        .bind(article.seo_score)
        .bind(article.scheduled_at)
        .bind(article.published_at)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        view_count: 0,
        like_count: 0,
        comment_count: 0,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

async fn set_related_sqlite(pool: &SqlitePool, article_id: i64, related_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM related_articles WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear related articles")?;

    for related_id in related_ids {
        sqlx::query("INSERT OR IGNORE INTO related_articles (article_id, related_article_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(related_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add related article")?;
    }

    tx.commit().await.context("Failed to commit related articles")?;
    Ok(())
}

async fn set_faqs_sqlite(pool: &SqlitePool, article_id: i64, faq_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_faqs WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article FAQs")?;

    for (position, faq_id) in faq_ids.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO article_faqs (article_id, faq_id, sort_order) VALUES (?, ?, ?)")
            .bind(article_id)
            .bind(faq_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .context("Failed to link FAQ")?;
    }

    tx.commit().await.context("Failed to commit article FAQs")?;
    Ok(())
}

async fn delete_cascade_sqlite(pool: &SqlitePool, tenant_id: i64, ids: &[i64]) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_CHUNK) {
        deleted += delete_chunk_sqlite(&mut tx, tenant_id, chunk).await?;
    }
    tx.commit().await.context("Failed to commit article deletion")?;
    Ok(deleted)
}

async fn delete_chunk_sqlite(conn: &mut SqliteConnection, tenant_id: i64, ids: &[i64]) -> Result<u64> {
    let select = format!(
        "SELECT id FROM articles WHERE tenant_id = ? AND id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&select).bind(tenant_id);
    for id in ids {
        query = query.bind(*id);
    }
    let owned: Vec<i64> = query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to resolve articles to delete")?
        .iter()
        .map(|row| row.get("id"))
        .collect();

    if owned.is_empty() {
        return Ok(0);
    }

    let list = placeholders(owned.len());

    for table in CASCADE_TABLES {
        let sql = format!("DELETE FROM {} WHERE article_id IN ({})", table, list);
        let mut query = sqlx::query(&sql);
        for id in &owned {
            query = query.bind(*id);
        }
        query
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to delete from {}", table))?;
    }

    let sql = format!(
        "DELETE FROM related_articles WHERE article_id IN ({list}) OR related_article_id IN ({list})",
        list = list
    );
    let mut query = sqlx::query(&sql);
    for id in owned.iter().chain(owned.iter()) {
        query = query.bind(*id);
    }
    query
        .execute(&mut *conn)
        .await
        .context("Failed to delete related article links")?;

    let sql = format!("DELETE FROM articles WHERE id IN ({})", list);
    let mut query = sqlx::query(&sql);
    for id in &owned {
        query = query.bind(*id);
    }
    Ok(query
        .execute(&mut *conn)
        .await
        .context("Failed to delete articles")?
        .rows_affected())
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let status: String = row.get("status");
    Ok(Article {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        client_id: row.get("client_id"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        meta_title: row.get("meta_title"),
        meta_description: row.get("meta_description"),
        focus_keyword: row.get("focus_keyword"),
        featured_image: row.get("featured_image"),
        featured_image_alt: row.get("featured_image_alt"),
        status: status.parse().map_err(anyhow::Error::msg)?,
        seo_score: row.get("seo_score"),
        view_count: row.get("view_count"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        scheduled_at: row.get("scheduled_at"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_version_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ArticleVersion> {
    Ok(ArticleVersion {
        id: row.get("id"),
        article_id: row.get("article_id"),
        version_number: row.get("version_number"),
        title: row.get("title"),
        content: row.get("content"),
        meta_title: row.get("meta_title"),
        meta_description: row.get("meta_description"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

fn bind_filter_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    tenant_id: i64,
    binds: &FilterBinds,
) -> Query<'q, MySql, MySqlArguments> {
    query
        .bind(tenant_id)
        .bind(binds.status)
        .bind(binds.status)
        .bind(binds.client_id)
        .bind(binds.client_id)
        .bind(binds.category_id)
        .bind(binds.category_id)
        .bind(binds.author_id)
        .bind(binds.author_id)
        .bind(binds.pattern.clone())
        .bind(binds.pattern.clone())
}

fn bind_update_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    article: &Article,
    now: DateTime<Utc>,
) -> Query<'q, MySql, MySqlArguments> {
    query
        .bind(article.client_id)
        .bind(article.category_id)
        .bind(article.author_id)
        .bind(article.slug.clone())
        .bind(article.title.clone())
        .bind(article.excerpt.clone())
        .bind(article.content.clone())
        .bind(article.content_html.clone())
        .bind(article.meta_title.clone())
        .bind(article.meta_description.clone())
        .bind(article.focus_keyword.clone())
        .bind(article.featured_image.clone())
        .bind(article.featured_image_alt.clone())
        .bind(article.status.as_str())
        .bind(article.seo_score)
        .bind(article.scheduled_at)
        .bind(article.published_at)
        .bind(now)
        .bind(article.tenant_id)
        .bind(article.id)
}

async fn create_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_ARTICLE)
        .bind(article.tenant_id)
        .bind(article.client_id)
        .bind(article.category_id)
        .bind(article.author_id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.content_html)
        .bind(&article.meta_title)
        .bind(&article.meta_description)
        .bind(&article.focus_keyword)
        .bind(&article.featured_image)
        .bind(&article.featured_image_alt)
        .bind(article.status.as_str())
        .bind(article.seo_score)
        .bind(article.scheduled_at)
        .bind(article.published_at)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_id() as i64,
        view_count: 0,
        like_count: 0,
        comment_count: 0,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

async fn set_related_mysql(pool: &MySqlPool, article_id: i64, related_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM related_articles WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear related articles")?;

    for related_id in related_ids {
        sqlx::query("INSERT IGNORE INTO related_articles (article_id, related_article_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(related_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add related article")?;
    }

    tx.commit().await.context("Failed to commit related articles")?;
    Ok(())
}

async fn set_faqs_mysql(pool: &MySqlPool, article_id: i64, faq_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_faqs WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article FAQs")?;

    for (position, faq_id) in faq_ids.iter().enumerate() {
        sqlx::query("INSERT IGNORE INTO article_faqs (article_id, faq_id, sort_order) VALUES (?, ?, ?)")
            .bind(article_id)
            .bind(faq_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .context("Failed to link FAQ")?;
    }

    tx.commit().await.context("Failed to commit article FAQs")?;
    Ok(())
}

async fn delete_cascade_mysql(pool: &MySqlPool, tenant_id: i64, ids: &[i64]) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_CHUNK) {
        deleted += delete_chunk_mysql(&mut tx, tenant_id, chunk).await?;
    }
    tx.commit().await.context("Failed to commit article deletion")?;
    Ok(deleted)
}

async fn delete_chunk_mysql(conn: &mut MySqlConnection, tenant_id: i64, ids: &[i64]) -> Result<u64> {
    let select = format!(
        "SELECT id FROM articles WHERE tenant_id = ? AND id IN ({}) FOR UPDATE",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&select).bind(tenant_id);
    for id in ids {
        query = query.bind(*id);
    }
    let owned: Vec<i64> = query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to resolve articles to delete")?
        .iter()
        .map(|row| row.get("id"))
        .collect();

    if owned.is_empty() {
        return Ok(0);
    }

    let list = placeholders(owned.len());

    for table in CASCADE_TABLES {
        let sql = format!("DELETE FROM {} WHERE article_id IN ({})", table, list);
        let mut query = sqlx::query(&sql);
        for id in &owned {
            query = query.bind(*id);
        }
        query
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to delete from {}", table))?;
    }

    let sql = format!(
        "DELETE FROM related_articles WHERE article_id IN ({list}) OR related_article_id IN ({list})",
        list = list
    );
    let mut query = sqlx::query(&sql);
    for id in owned.iter().chain(owned.iter()) {
        query = query.bind(*id);
    }
    query
        .execute(&mut *conn)
        .await
        .context("Failed to delete related article links")?;

    let sql = format!("DELETE FROM articles WHERE id IN ({})", list);
    let mut query = sqlx::query(&sql);
    for id in &owned {
        query = query.bind(*id);
    }
    Ok(query
        .execute(&mut *conn)
        .await
        .context("Failed to delete articles")?
        .rows_affected())
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    let status: String = row.get("status");
    Ok(Article {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        client_id: row.get("client_id"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        meta_title: row.get("meta_title"),
        meta_description: row.get("meta_description"),
        focus_keyword: row.get("focus_keyword"),
        featured_image: row.get("featured_image"),
        featured_image_alt: row.get("featured_image_alt"),
        status: status.parse().map_err(anyhow::Error::msg)?,
        seo_score: row.get("seo_score"),
        view_count: row.get("view_count"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        scheduled_at: row.get("scheduled_at"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_version_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ArticleVersion> {
    Ok(ArticleVersion {
        id: row.get("id"),
        article_id: row.get("article_id"),
        version_number: row.get("version_number"),
        title: row.get("title"),
        content: row.get("content"),
        meta_title: row.get("meta_title"),
        meta_description: row.get("meta_description"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> (DynDatabasePool, SqlxArticleRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (pool.clone(), SqlxArticleRepository::new(pool))
    }

    fn new_article(tenant_id: i64, slug: &str) -> Article {
        let now = Utc::now();
        Article {
            id: 0,
            tenant_id,
            client_id: None,
            category_id: None,
            author_id: None,
            slug: slug.to_string(),
            title: format!("Title {}", slug),
            excerpt: None,
            content: "Some **markdown**".to_string(),
            content_html: "<p>Some <strong>markdown</strong></p>".to_string(),
            meta_title: None,
            meta_description: None,
            focus_keyword: None,
            featured_image: None,
            featured_image_alt: None,
            status: ArticleStatus::Draft,
            seo_score: 10,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            scheduled_at: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn exec(pool: &DynDatabasePool, sql: &str) {
        sqlx::query(sql)
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap_or_else(|e| panic!("{}: {}", sql, e));
    }

    async fn count_rows(pool: &DynDatabasePool, sql: &str) -> i64 {
        sqlx::query(sql)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .get(0)
    }

    #[tokio::test]
    async fn test_create_and_get_article() {
        let (_pool, repo) = setup().await;
        let created = repo.create(&new_article(1, "first-post")).await.expect("Failed to create");

        assert!(created.id > 0);
        let by_id = repo.get_by_id(1, created.id).await.unwrap().unwrap();
        assert_eq!(by_id.slug, "first-post");
        assert_eq!(by_id.status, ArticleStatus::Draft);
        assert_eq!(by_id.seo_score, 10);

        let by_slug = repo.get_by_slug(1, "first-post").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);

        assert!(repo.get_by_id(2, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_slug_with_exclusion() {
        let (_pool, repo) = setup().await;
        let created = repo.create(&new_article(1, "taken")).await.unwrap();

        assert!(repo.exists_by_slug(1, "taken", None).await.unwrap());
        assert!(!repo.exists_by_slug(1, "taken", Some(created.id)).await.unwrap());
        assert!(!repo.exists_by_slug(1, "free", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let (_pool, repo) = setup().await;
        let mut published = new_article(1, "rust-tips");
        published.title = "Rust Tips".to_string();
        published.status = ArticleStatus::Published;
        repo.create(&published).await.unwrap();
        repo.create(&new_article(1, "draft-one")).await.unwrap();
        repo.create(&new_article(1, "draft-two")).await.unwrap();

        let all = repo.list(1, &ArticleFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let drafts = ArticleFilter {
            status: Some(ArticleStatus::Draft),
            ..Default::default()
        };
        assert_eq!(repo.count(1, &drafts).await.unwrap(), 2);

        let search = ArticleFilter {
            search: Some("RUST".to_string()),
            ..Default::default()
        };
        let found = repo.list(1, &search, &ListParams::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "rust-tips");

        let page = repo.list(1, &ArticleFilter::default(), &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_update_article() {
        let (_pool, repo) = setup().await;
        let mut article = repo.create(&new_article(1, "editable")).await.unwrap();

        article.title = "Edited".to_string();
        article.seo_score = 70;
        repo.update(&article).await.expect("Failed to update");

        let stored = repo.get_by_id(1, article.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Edited");
        assert_eq!(stored.seo_score, 70);

        article.id = 9999;
        assert!(repo.update(&article).await.is_err());
    }

    #[tokio::test]
    async fn test_bulk_update_status_sets_published_at_once() {
        let (_pool, repo) = setup().await;
        let a = repo.create(&new_article(1, "a")).await.unwrap();
        let b = repo.create(&new_article(1, "b")).await.unwrap();
        let other = repo.create(&new_article(1, "c")).await.unwrap();

        let changed = repo
            .bulk_update_status(1, &[a.id, b.id], ArticleStatus::Published)
            .await
            .unwrap();
        assert_eq!(changed, 2);

        let first = repo.get_by_id(1, a.id).await.unwrap().unwrap();
        assert_eq!(first.status, ArticleStatus::Published);
        let stamped = first.published_at.expect("published_at set");

        repo.bulk_update_status(1, &[a.id], ArticleStatus::Archived).await.unwrap();
        repo.bulk_update_status(1, &[a.id], ArticleStatus::Published).await.unwrap();
        let again = repo.get_by_id(1, a.id).await.unwrap().unwrap();
        assert_eq!(again.published_at, Some(stamped));

        let untouched = repo.get_by_id(1, other.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, ArticleStatus::Draft);
        assert_eq!(repo.bulk_update_status(1, &[], ArticleStatus::Draft).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_versions_are_numbered_sequentially() {
        let (_pool, repo) = setup().await;
        let mut article = repo.create(&new_article(1, "versioned")).await.unwrap();

        let v1 = repo.create_version(&article).await.unwrap();
        article.title = "Second title".to_string();
        let v2 = repo.create_version(&article).await.unwrap();

        assert_eq!(v1.version_number, 1);
        assert_eq!(v2.version_number, 2);
        assert_eq!(v2.title, "Second title");

        let versions = repo.list_versions(article.id).await.unwrap();
        assert_eq!(versions.iter().map(|v| v.version_number).collect::<Vec<_>>(), vec![2, 1]);

        assert!(repo.get_version(article.id, v1.id).await.unwrap().is_some());
        assert!(repo.get_version(article.id + 1, v1.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_related_articles_filtered_by_status() {
        let (_pool, repo) = setup().await;
        let main = repo.create(&new_article(1, "main")).await.unwrap();
        let mut live = new_article(1, "live");
        live.status = ArticleStatus::Published;
        let live = repo.create(&live).await.unwrap();
        let draft = repo.create(&new_article(1, "hidden")).await.unwrap();

        repo.set_related(main.id, &[live.id, draft.id]).await.unwrap();
        assert_eq!(repo.list_related(main.id, false).await.unwrap().len(), 2);

        let visible = repo.list_related(main.id, true).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, live.id);

        repo.set_related(main.id, &[]).await.unwrap();
        assert!(repo.list_related(main.id, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_view_increments_counter() {
        let (pool, repo) = setup().await;
        let article = repo.create(&new_article(1, "viewed")).await.unwrap();

        repo.record_view(1, article.id, Some("visitor-1"), Some("https://example.com"))
            .await
            .unwrap();
        repo.record_view(1, article.id, None, None).await.unwrap();

        let stored = repo.get_by_id(1, article.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 2);
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM analytics").await, 2);
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_children() {
        let (pool, repo) = setup().await;
        let first = repo.create(&new_article(1, "doomed-1")).await.unwrap();
        let second = repo.create(&new_article(1, "doomed-2")).await.unwrap();
        let survivor = repo.create(&new_article(1, "survivor")).await.unwrap();

        exec(&pool, "INSERT INTO users (tenant_id, username, email) VALUES (1, 'reader', 'r@example.com')").await;
        exec(&pool, "INSERT INTO tags (tenant_id, slug, name) VALUES (1, 'rust', 'Rust')").await;
        exec(&pool, "INSERT INTO faqs (tenant_id, question, answer) VALUES (1, 'Q?', 'A.')").await;
        for id in [first.id, second.id] {
            exec(&pool, &format!("INSERT INTO article_tags (article_id, tag_id) VALUES ({}, 1)", id)).await;
            exec(&pool, &format!("INSERT INTO article_faqs (article_id, faq_id) VALUES ({}, 1)", id)).await;
            exec(&pool, &format!("INSERT INTO article_likes (article_id, user_id) VALUES ({}, 1)", id)).await;
            exec(&pool, &format!("INSERT INTO favorites (article_id, user_id) VALUES ({}, 1)", id)).await;
            exec(
                &pool,
                &format!("INSERT INTO comments (tenant_id, article_id, user_id, content) VALUES (1, {}, 1, 'hi')", id),
            )
            .await;
            repo.record_view(1, id, None, None).await.unwrap();
            repo.create_version(&first).await.unwrap();
        }
        exec(
            &pool,
            &format!("INSERT INTO comments (tenant_id, article_id, user_id, parent_id, content) VALUES (1, {}, 1, 1, 'reply')", first.id),
        )
        .await;
        repo.set_related(survivor.id, &[first.id]).await.unwrap();
        repo.set_related(first.id, &[survivor.id]).await.unwrap();

        let deleted = repo.delete_cascade(1, &[first.id, second.id]).await.expect("Failed to delete");
        assert_eq!(deleted, 2);

        for table in CASCADE_TABLES {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE article_id IN ({}, {})",
                table, first.id, second.id
            );
            assert_eq!(count_rows(&pool, &sql).await, 0, "{} still has rows", table);
        }
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM related_articles").await, 0);
        assert!(repo.get_by_id(1, first.id).await.unwrap().is_none());
        assert!(repo.get_by_id(1, second.id).await.unwrap().is_none());
        assert!(repo.get_by_id(1, survivor.id).await.unwrap().is_some());
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM tags").await, 1);
    }

    #[tokio::test]
    async fn test_delete_cascade_ignores_other_tenants() {
        let (pool, repo) = setup().await;
        exec(&pool, "INSERT INTO tenants (slug, name) VALUES ('acme', 'Acme')").await;
        let foreign = repo.create(&new_article(2, "foreign")).await.unwrap();

        assert_eq!(repo.delete_cascade(1, &[foreign.id]).await.unwrap(), 0);
        assert!(repo.get_by_id(2, foreign.id).await.unwrap().is_some());
        assert_eq!(repo.delete_cascade(1, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascade_handles_large_batches() {
        let (pool, repo) = setup().await;
        exec(
            &pool,
            "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 1000) \
             INSERT INTO articles (tenant_id, slug, title, content, content_html, status) \
             SELECT 1, 'bulk-' || i, 'T', 'c', '', 'draft' FROM n",
        )
        .await;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM articles ORDER BY id")
            .fetch_all(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(ids.len(), 1000);
        // Links that cross batch boundaries
        repo.set_related(ids[0], &[ids[999], ids[500]]).await.unwrap();
        repo.set_related(ids[999], &[ids[0]]).await.unwrap();
        exec(
            &pool,
            &format!("INSERT INTO analytics (tenant_id, article_id) VALUES (1, {}), (1, {})", ids[1], ids[998]),
        )
        .await;

        let deleted = repo.delete_cascade(1, &ids).await.expect("Failed to delete");

        assert_eq!(deleted, 1000);
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM articles").await, 0);
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM related_articles").await, 0);
        assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM analytics").await, 0);
    }

    #[tokio::test]
    async fn test_export_rows_join_names() {
        let (pool, repo) = setup().await;
        exec(&pool, "INSERT INTO clients (tenant_id, name) VALUES (1, 'Acme, Inc.')").await;
        exec(&pool, "INSERT INTO categories (tenant_id, slug, name) VALUES (1, 'news', 'News')").await;
        exec(
            &pool,
            "INSERT INTO users (tenant_id, username, email, display_name) VALUES (1, 'ada', 'ada@example.com', 'Ada L')",
        )
        .await;

        let mut article = new_article(1, "exported");
        article.client_id = Some(1);
        article.category_id = Some(1);
        article.author_id = Some(1);
        repo.create(&article).await.unwrap();
        repo.create(&new_article(1, "bare")).await.unwrap();

        let rows = repo.export_rows(1, &ArticleFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 2);
        let joined = rows.iter().find(|r| r.title == "Title exported").unwrap();
        assert_eq!(joined.client_name.as_deref(), Some("Acme, Inc."));
        assert_eq!(joined.category_name.as_deref(), Some("News"));
        assert_eq!(joined.author_name.as_deref(), Some("Ada L"));

        let bare = rows.iter().find(|r| r.title == "Title bare").unwrap();
        assert!(bare.client_name.is_none());
        assert!(bare.author_name.is_none());
    }

    #[tokio::test]
    async fn test_publish_due_articles() {
        let (_pool, repo) = setup().await;
        let now = Utc::now();

        let mut due = new_article(1, "due");
        due.status = ArticleStatus::Scheduled;
        due.scheduled_at = Some(now - Duration::minutes(5));
        let due = repo.create(&due).await.unwrap();

        let mut later = new_article(1, "later");
        later.status = ArticleStatus::Scheduled;
        later.scheduled_at = Some(now + Duration::hours(1));
        let later = repo.create(&later).await.unwrap();

        let tenants = repo.publish_due(now).await.unwrap();
        assert_eq!(tenants, vec![1]);

        let published = repo.get_by_id(1, due.id).await.unwrap().unwrap();
        assert_eq!(published.status, ArticleStatus::Published);
        assert_eq!(published.published_at, due.scheduled_at);

        let waiting = repo.get_by_id(1, later.id).await.unwrap().unwrap();
        assert_eq!(waiting.status, ArticleStatus::Scheduled);

        assert!(repo.publish_due(now).await.unwrap().is_empty());
    }
}
