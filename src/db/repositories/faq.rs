//! FAQ repository
//!
//! This module provides:
//! - `FaqRepository` trait defining the interface for FAQ data access
//! - `SqlxFaqRepository` implementing the trait for SQLite and MySQL
//!
//! Feedback is applied inside a single transaction: the stored vote for an
//! identity and the FAQ counters always move together.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Faq, FaqFeedbackResult, FeedbackIdentity, FeedbackOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// FAQ repository trait
#[async_trait]
pub trait FaqRepository: Send + Sync {
    /// Create a new FAQ
    async fn create(&self, faq: &Faq) -> Result<Faq>;

    /// Get FAQ by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Faq>>;

    /// List FAQs ordered by sort order, then id
    async fn list(&self, tenant_id: i64, published_only: bool) -> Result<Vec<Faq>>;

    /// Write the editable fields of an FAQ
    async fn update(&self, faq: &Faq) -> Result<Faq>;

    /// Delete an FAQ together with its feedback and article links
    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool>;

    /// FAQs linked to an article, in link order
    async fn list_for_article(&self, article_id: i64, published_only: bool) -> Result<Vec<Faq>>;

    /// Apply a helpful/unhelpful vote from one identity
    async fn submit_feedback(&self, faq_id: i64, identity: &FeedbackIdentity, helpful: bool) -> Result<FaqFeedbackResult>;
}

/// SQLx-based FAQ repository implementation
pub struct SqlxFaqRepository {
    pool: DynDatabasePool,
}

impl SqlxFaqRepository {
    /// Create a new SQLx FAQ repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FaqRepository> {
        Arc::new(Self::new(pool))
    }
}

const FAQ_COLUMNS: &str = "id, tenant_id, question, answer, category, sort_order, is_published, \
    upvotes, downvotes, created_at, updated_at";

const INSERT_FAQ: &str = r#"
    INSERT INTO faqs (tenant_id, question, answer, category, sort_order, is_published, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_FAQ: &str = r#"
    UPDATE faqs
    SET question = ?, answer = ?, category = ?, sort_order = ?, is_published = ?, updated_at = ?
    WHERE tenant_id = ? AND id = ?
"#;

const LIST_ARTICLE_FAQS: &str = r#"
    SELECT f.id, f.tenant_id, f.question, f.answer, f.category, f.sort_order, f.is_published,
           f.upvotes, f.downvotes, f.created_at, f.updated_at
    FROM article_faqs af
    INNER JOIN faqs f ON f.id = af.faq_id
    WHERE af.article_id = ? AND (? = 0 OR f.is_published = 1)
    ORDER BY af.sort_order, f.id
"#;

const INSERT_FEEDBACK: &str = r#"
    INSERT INTO faq_feedback (faq_id, user_id, session_id, is_helpful, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

const UPDATE_FEEDBACK: &str = "UPDATE faq_feedback SET is_helpful = ?, updated_at = ? WHERE id = ?";

const SELECT_COUNTERS: &str = "SELECT upvotes, downvotes FROM faqs WHERE id = ?";

fn counter_column(helpful: bool) -> &'static str {
    if helpful {
        "upvotes"
    } else {
        "downvotes"
    }
}

fn identity_lookup(identity: &FeedbackIdentity) -> &'static str {
    match identity {
        FeedbackIdentity::User(_) => "SELECT id, is_helpful FROM faq_feedback WHERE faq_id = ? AND user_id = ?",
        FeedbackIdentity::Session(_) => {
            "SELECT id, is_helpful FROM faq_feedback WHERE faq_id = ? AND session_id = ?"
        }
    }
}

fn identity_parts(identity: &FeedbackIdentity) -> (Option<i64>, Option<String>) {
    match identity {
        FeedbackIdentity::User(id) => (Some(*id), None),
        FeedbackIdentity::Session(session) => (None, Some(session.clone())),
    }
}

#[async_trait]
impl FaqRepository for SqlxFaqRepository {
    async fn create(&self, faq: &Faq) -> Result<Faq> {
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_FAQ)
                .bind(faq.tenant_id)
                .bind(&faq.question)
                .bind(&faq.answer)
                .bind(&faq.category)
                .bind(faq.sort_order)
                .bind(faq.is_published)
                .bind(now)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create FAQ")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_FAQ)
                .bind(faq.tenant_id)
                .bind(&faq.question)
                .bind(&faq.answer)
                .bind(&faq.category)
                .bind(faq.sort_order)
                .bind(faq.is_published)
                .bind(now)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create FAQ")?
                .last_insert_id() as i64,
        };

        Ok(Faq {
            id,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
            ..faq.clone()
        })
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Faq>> {
        let sql = format!("SELECT {} FROM faqs WHERE tenant_id = ? AND id = ?", FAQ_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get FAQ by ID")?
                .as_ref()
                .map(row_to_faq_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get FAQ by ID")?
                .as_ref()
                .map(row_to_faq_mysql)
                .transpose(),
        }
    }

    async fn list(&self, tenant_id: i64, published_only: bool) -> Result<Vec<Faq>> {
        let sql = format!(
            "SELECT {} FROM faqs WHERE tenant_id = ? AND (? = 0 OR is_published = 1) ORDER BY sort_order, id",
            FAQ_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(tenant_id)
                    .bind(published_only)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list FAQs")?;
                rows.iter().map(row_to_faq_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(tenant_id)
                    .bind(published_only)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list FAQs")?;
                rows.iter().map(row_to_faq_mysql).collect()
            }
        }
    }

    async fn update(&self, faq: &Faq) -> Result<Faq> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UPDATE_FAQ)
                .bind(&faq.question)
                .bind(&faq.answer)
                .bind(&faq.category)
                .bind(faq.sort_order)
                .bind(faq.is_published)
                .bind(now)
                .bind(faq.tenant_id)
                .bind(faq.id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update FAQ")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(UPDATE_FAQ)
                .bind(&faq.question)
                .bind(&faq.answer)
                .bind(&faq.category)
                .bind(faq.sort_order)
                .bind(faq.is_published)
                .bind(now)
                .bind(faq.tenant_id)
                .bind(faq.id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update FAQ")?
                .rows_affected(),
        };

        if affected == 0 {
            anyhow::bail!("FAQ not found: {}", faq.id);
        }

        Ok(Faq {
            updated_at: now,
            ..faq.clone()
        })
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<bool> {
        let sql = "DELETE FROM faqs WHERE tenant_id = ? AND id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete FAQ")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(tenant_id)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete FAQ")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_for_article(&self, article_id: i64, published_only: bool) -> Result<Vec<Faq>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_ARTICLE_FAQS)
                    .bind(article_id)
                    .bind(published_only)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list article FAQs")?;
                rows.iter().map(row_to_faq_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_ARTICLE_FAQS)
                    .bind(article_id)
                    .bind(published_only)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list article FAQs")?;
                rows.iter().map(row_to_faq_mysql).collect()
            }
        }
    }

    async fn submit_feedback(&self, faq_id: i64, identity: &FeedbackIdentity, helpful: bool) -> Result<FaqFeedbackResult> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => submit_feedback_sqlite(self.pool.sqlite()?, faq_id, identity, helpful).await,
            DatabaseDriver::Mysql => submit_feedback_mysql(self.pool.mysql()?, faq_id, identity, helpful).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn submit_feedback_sqlite(
    pool: &SqlitePool,
    faq_id: i64,
    identity: &FeedbackIdentity,
    helpful: bool,
) -> Result<FaqFeedbackResult> {
    let now = Utc::now();
    let (user_id, session_id) = identity_parts(identity);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let lookup = sqlx::query(identity_lookup(identity)).bind(faq_id);
    let lookup = match identity {
        FeedbackIdentity::User(id) => lookup.bind(*id),
        FeedbackIdentity::Session(session) => lookup.bind(session.clone()),
    };
    let existing = lookup
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to look up existing feedback")?;

    let outcome = match existing {
        Some(row) if row.get::<bool, _>("is_helpful") == helpful => FeedbackOutcome::Unchanged,
        Some(row) => {
            let feedback_id: i64 = row.get("id");
            sqlx::query(UPDATE_FEEDBACK)
                .bind(helpful)
                .bind(now)
                .bind(feedback_id)
                .execute(&mut *tx)
                .await
                .context("Failed to update feedback")?;

            let old = counter_column(!helpful);
            let new = counter_column(helpful);
            let sql = format!(
                "UPDATE faqs SET {old} = MAX({old} - 1, 0), {new} = {new} + 1 WHERE id = ?",
                old = old,
                new = new
            );
            sqlx::query(&sql)
                .bind(faq_id)
                .execute(&mut *tx)
                .await
                .context("Failed to move FAQ vote")?;
            FeedbackOutcome::Changed
        }
        None => {
            sqlx::query(INSERT_FEEDBACK)
                .bind(faq_id)
                .bind(user_id)
                .bind(&session_id)
                .bind(helpful)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to record feedback")?;

            let sql = format!(
                "UPDATE faqs SET {col} = {col} + 1 WHERE id = ?",
                col = counter_column(helpful)
            );
            sqlx::query(&sql)
                .bind(faq_id)
                .execute(&mut *tx)
                .await
                .context("Failed to count FAQ vote")?;
            FeedbackOutcome::Recorded
        }
    };

    let counters = sqlx::query(SELECT_COUNTERS)
        .bind(faq_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read FAQ counters")?;

    tx.commit().await.context("Failed to commit feedback")?;

    Ok(FaqFeedbackResult {
        faq_id,
        outcome,
        upvotes: counters.get("upvotes"),
        downvotes: counters.get("downvotes"),
    })
}

fn row_to_faq_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Faq> {
    Ok(Faq {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        question: row.get("question"),
        answer: row.get("answer"),
        category: row.get("category"),
        sort_order: row.get("sort_order"),
        is_published: row.get("is_published"),
        upvotes: row.get("upvotes"),
        downvotes: row.get("downvotes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn submit_feedback_mysql(
    pool: &MySqlPool,
    faq_id: i64,
    identity: &FeedbackIdentity,
    helpful: bool,
) -> Result<FaqFeedbackResult> {
    let now = Utc::now();
    let (user_id, session_id) = identity_parts(identity);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // Lock the FAQ row so concurrent votes serialise on the counters
    sqlx::query("SELECT id FROM faqs WHERE id = ? FOR UPDATE")
        .bind(faq_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock FAQ")?;

    let lookup = sqlx::query(identity_lookup(identity)).bind(faq_id);
    let lookup = match identity {
        FeedbackIdentity::User(id) => lookup.bind(*id),
        FeedbackIdentity::Session(session) => lookup.bind(session.clone()),
    };
    let existing = lookup
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to look up existing feedback")?;

    let outcome = match existing {
        Some(row) if row.get::<bool, _>("is_helpful") == helpful => FeedbackOutcome::Unchanged,
        Some(row) => {
            let feedback_id: i64 = row.get("id");
            sqlx::query(UPDATE_FEEDBACK)
                .bind(helpful)
                .bind(now)
                .bind(feedback_id)
                .execute(&mut *tx)
                .await
                .context("Failed to update feedback")?;

            let old = counter_column(!helpful);
            let new = counter_column(helpful);
            let sql = format!(
                "UPDATE faqs SET {old} = GREATEST({old} - 1, 0), {new} = {new} + 1 WHERE id = ?",
                old = old,
                new = new
            );
            sqlx::query(&sql)
                .bind(faq_id)
                .execute(&mut *tx)
                .await
                .context("Failed to move FAQ vote")?;
            FeedbackOutcome::Changed
        }
        None => {
            sqlx::query(INSERT_FEEDBACK)
                .bind(faq_id)
                .bind(user_id)
                .bind(&session_id)
                .bind(helpful)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to record feedback")?;

            let sql = format!(
                "UPDATE faqs SET {col} = {col} + 1 WHERE id = ?",
                col = counter_column(helpful)
            );
            sqlx::query(&sql)
                .bind(faq_id)
                .execute(&mut *tx)
                .await
                .context("Failed to count FAQ vote")?;
            FeedbackOutcome::Recorded
        }
    };

    let counters = sqlx::query(SELECT_COUNTERS)
        .bind(faq_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read FAQ counters")?;

    tx.commit().await.context("Failed to commit feedback")?;

    Ok(FaqFeedbackResult {
        faq_id,
        outcome,
        upvotes: counters.get("upvotes"),
        downvotes: counters.get("downvotes"),
    })
}

fn row_to_faq_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Faq> {
    Ok(Faq {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        question: row.get("question"),
        answer: row.get("answer"),
        category: row.get("category"),
        sort_order: row.get("sort_order"),
        is_published: row.get("is_published"),
        upvotes: row.get("upvotes"),
        downvotes: row.get("downvotes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
