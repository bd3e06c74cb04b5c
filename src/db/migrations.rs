//! Database migrations module
//!
//! Code-based migrations embedded as SQL strings for both SQLite and MySQL,
//! so the binary carries its own schema.
//!
//! # Usage
//!
//! ```ignore
//! use quillpress::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! # Architecture
//!
//! Each migration is defined as a `Migration` struct containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_sqlite`: SQL for SQLite database
//! - `up_mysql`: SQL for MySQL database
//!
//! Rows that belong to an article (tags, versions, FAQ links, related links,
//! analytics, comments, likes, favorites) reference it without a cascading
//! delete. The article service removes them inside one transaction.

use std::collections::HashSet;

use anyhow::{Context, Result};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All schema migrations, applied in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_tenants",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tenants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(100) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO tenants (slug, name) VALUES ('default', 'Default');
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tenants (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(100) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT IGNORE INTO tenants (slug, name) VALUES ('default', 'Default');
        "#,
    },
    Migration {
        version: 2,
        name: "create_users_and_follows",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                username VARCHAR(50) NOT NULL,
                email VARCHAR(255) NOT NULL,
                display_name VARCHAR(100),
                bio TEXT,
                avatar VARCHAR(500),
                role VARCHAR(20) NOT NULL DEFAULT 'reader'
                    CHECK (role IN ('admin', 'editor', 'author', 'reader')),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE (tenant_id, username),
                UNIQUE (tenant_id, email)
            );
            CREATE TABLE IF NOT EXISTS follows (
                follower_id INTEGER NOT NULL,
                following_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (follower_id, following_id),
                FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (following_id) REFERENCES users(id) ON DELETE CASCADE,
                CHECK (follower_id <> following_id)
            );
            CREATE INDEX IF NOT EXISTS idx_follows_following_id ON follows(following_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                username VARCHAR(50) NOT NULL,
                email VARCHAR(255) NOT NULL,
                display_name VARCHAR(100),
                bio TEXT,
                avatar VARCHAR(500),
                role VARCHAR(20) NOT NULL DEFAULT 'reader'
                    CHECK (role IN ('admin', 'editor', 'author', 'reader')),
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE KEY uq_users_tenant_username (tenant_id, username),
                UNIQUE KEY uq_users_tenant_email (tenant_id, email)
            );
            CREATE TABLE IF NOT EXISTS follows (
                follower_id BIGINT NOT NULL,
                following_id BIGINT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (follower_id, following_id),
                FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (following_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_follows_following_id ON follows(following_id);
        "#,
    },
    Migration {
        version: 3,
        name: "create_tiers_and_clients",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS subscription_tiers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                slug VARCHAR(100) NOT NULL,
                name VARCHAR(100) NOT NULL,
                monthly_article_quota INTEGER,
                price_cents INTEGER NOT NULL DEFAULT 0,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE (tenant_id, slug)
            );
            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255),
                company VARCHAR(255),
                website VARCHAR(500),
                status VARCHAR(20) NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'paused', 'churned')),
                tier_id INTEGER,
                subscription_started_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (tier_id) REFERENCES subscription_tiers(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_clients_tenant_status ON clients(tenant_id, status);
            CREATE INDEX IF NOT EXISTS idx_clients_tier_id ON clients(tier_id);
            INSERT OR IGNORE INTO subscription_tiers
                (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active)
            SELECT id, 'starter', 'Starter', 4, 9900, 'Four articles per month', 1
            FROM tenants WHERE slug = 'default';
            INSERT OR IGNORE INTO subscription_tiers
                (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active)
            SELECT id, 'growth', 'Growth', 12, 24900, 'Twelve articles per month', 1
            FROM tenants WHERE slug = 'default';
            INSERT OR IGNORE INTO subscription_tiers
                (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active)
            SELECT id, 'enterprise', 'Enterprise', NULL, 59900, 'Unlimited articles', 1
            FROM tenants WHERE slug = 'default';
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS subscription_tiers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                slug VARCHAR(100) NOT NULL,
                name VARCHAR(100) NOT NULL,
                monthly_article_quota BIGINT,
                price_cents BIGINT NOT NULL DEFAULT 0,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE KEY uq_tiers_tenant_slug (tenant_id, slug)
            );
            CREATE TABLE IF NOT EXISTS clients (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255),
                company VARCHAR(255),
                website VARCHAR(500),
                status VARCHAR(20) NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'paused', 'churned')),
                tier_id BIGINT,
                subscription_started_at DATETIME NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (tier_id) REFERENCES subscription_tiers(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_clients_tenant_status ON clients(tenant_id, status);
            INSERT IGNORE INTO subscription_tiers
                (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active)
            SELECT id, 'starter', 'Starter', 4, 9900, 'Four articles per month', TRUE
            FROM tenants WHERE slug = 'default';
            INSERT IGNORE INTO subscription_tiers
                (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active)
            SELECT id, 'growth', 'Growth', 12, 24900, 'Twelve articles per month', TRUE
            FROM tenants WHERE slug = 'default';
            INSERT IGNORE INTO subscription_tiers
                (tenant_id, slug, name, monthly_article_quota, price_cents, description, is_active)
            SELECT id, 'enterprise', 'Enterprise', NULL, 59900, 'Unlimited articles', TRUE
            FROM tenants WHERE slug = 'default';
        "#,
    },
    Migration {
        version: 4,
        name: "create_subscribers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                email VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                status VARCHAR(20) NOT NULL DEFAULT 'subscribed'
                    CHECK (status IN ('subscribed', 'unsubscribed')),
                source VARCHAR(100),
                subscribed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                unsubscribed_at TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE (tenant_id, email)
            );
            CREATE INDEX IF NOT EXISTS idx_subscribers_tenant_status ON subscribers(tenant_id, status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                email VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                status VARCHAR(20) NOT NULL DEFAULT 'subscribed'
                    CHECK (status IN ('subscribed', 'unsubscribed')),
                source VARCHAR(100),
                subscribed_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                unsubscribed_at DATETIME NULL,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE KEY uq_subscribers_tenant_email (tenant_id, email)
            );
            CREATE INDEX idx_subscribers_tenant_status ON subscribers(tenant_id, status);
        "#,
    },
    Migration {
        version: 5,
        name: "create_categories_and_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                slug VARCHAR(100) NOT NULL,
                name VARCHAR(100) NOT NULL,
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE (tenant_id, slug)
            );
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                slug VARCHAR(100) NOT NULL,
                name VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE (tenant_id, slug)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                slug VARCHAR(100) NOT NULL,
                name VARCHAR(100) NOT NULL,
                description TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE KEY uq_categories_tenant_slug (tenant_id, slug)
            );
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                slug VARCHAR(100) NOT NULL,
                name VARCHAR(100) NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                UNIQUE KEY uq_tags_tenant_slug (tenant_id, slug)
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                client_id INTEGER,
                category_id INTEGER,
                author_id INTEGER,
                slug VARCHAR(255) NOT NULL,
                title VARCHAR(500) NOT NULL,
                excerpt TEXT,
                content TEXT NOT NULL,
                content_html TEXT NOT NULL,
                meta_title VARCHAR(255),
                meta_description VARCHAR(500),
                focus_keyword VARCHAR(255),
                featured_image VARCHAR(1000),
                featured_image_alt VARCHAR(500),
                status VARCHAR(20) NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'scheduled', 'published', 'archived')),
                seo_score INTEGER NOT NULL DEFAULT 0,
                view_count INTEGER NOT NULL DEFAULT 0,
                like_count INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                scheduled_at TIMESTAMP,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (client_id) REFERENCES clients(id) ON DELETE SET NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL,
                UNIQUE (tenant_id, slug)
            );
            CREATE INDEX IF NOT EXISTS idx_articles_tenant_status ON articles(tenant_id, status);
            CREATE INDEX IF NOT EXISTS idx_articles_tenant_created ON articles(tenant_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_articles_client_id ON articles(client_id);
            CREATE INDEX IF NOT EXISTS idx_articles_scheduled ON articles(status, scheduled_at);
            CREATE TABLE IF NOT EXISTS article_tags (
                article_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_tags_tag_id ON article_tags(tag_id);
            CREATE TABLE IF NOT EXISTS article_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                version_number INTEGER NOT NULL,
                title VARCHAR(500) NOT NULL,
                content TEXT NOT NULL,
                meta_title VARCHAR(255),
                meta_description VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id),
                UNIQUE (article_id, version_number)
            );
            CREATE TABLE IF NOT EXISTS related_articles (
                article_id INTEGER NOT NULL,
                related_article_id INTEGER NOT NULL,
                PRIMARY KEY (article_id, related_article_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (related_article_id) REFERENCES articles(id)
            );
            CREATE INDEX IF NOT EXISTS idx_related_articles_related ON related_articles(related_article_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                client_id BIGINT,
                category_id BIGINT,
                author_id BIGINT,
                slug VARCHAR(255) NOT NULL,
                title VARCHAR(500) NOT NULL,
                excerpt TEXT,
                content LONGTEXT NOT NULL,
                content_html LONGTEXT NOT NULL,
                meta_title VARCHAR(255),
                meta_description VARCHAR(500),
                focus_keyword VARCHAR(255),
                featured_image VARCHAR(1000),
                featured_image_alt VARCHAR(500),
                status VARCHAR(20) NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'scheduled', 'published', 'archived')),
                seo_score BIGINT NOT NULL DEFAULT 0,
                view_count BIGINT NOT NULL DEFAULT 0,
                like_count BIGINT NOT NULL DEFAULT 0,
                comment_count BIGINT NOT NULL DEFAULT 0,
                scheduled_at DATETIME NULL,
                published_at DATETIME NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (client_id) REFERENCES clients(id) ON DELETE SET NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL,
                UNIQUE KEY uq_articles_tenant_slug (tenant_id, slug)
            );
            CREATE INDEX idx_articles_tenant_status ON articles(tenant_id, status);
            CREATE INDEX idx_articles_tenant_created ON articles(tenant_id, created_at);
            CREATE INDEX idx_articles_scheduled ON articles(status, scheduled_at);
            CREATE TABLE IF NOT EXISTS article_tags (
                article_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS article_versions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                article_id BIGINT NOT NULL,
                version_number BIGINT NOT NULL,
                title VARCHAR(500) NOT NULL,
                content LONGTEXT NOT NULL,
                meta_title VARCHAR(255),
                meta_description VARCHAR(500),
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id),
                UNIQUE KEY uq_article_versions_number (article_id, version_number)
            );
            CREATE TABLE IF NOT EXISTS related_articles (
                article_id BIGINT NOT NULL,
                related_article_id BIGINT NOT NULL,
                PRIMARY KEY (article_id, related_article_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (related_article_id) REFERENCES articles(id)
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_faqs",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS faqs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                category VARCHAR(100),
                sort_order INTEGER NOT NULL DEFAULT 0,
                is_published BOOLEAN NOT NULL DEFAULT 1,
                upvotes INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
                downvotes INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id)
            );
            CREATE INDEX IF NOT EXISTS idx_faqs_tenant_order ON faqs(tenant_id, sort_order);
            CREATE TABLE IF NOT EXISTS faq_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faq_id INTEGER NOT NULL,
                user_id INTEGER,
                session_id VARCHAR(128),
                is_helpful BOOLEAN NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (faq_id) REFERENCES faqs(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE (faq_id, user_id),
                UNIQUE (faq_id, session_id)
            );
            CREATE TABLE IF NOT EXISTS article_faqs (
                article_id INTEGER NOT NULL,
                faq_id INTEGER NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (article_id, faq_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (faq_id) REFERENCES faqs(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS faqs (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                category VARCHAR(100),
                sort_order BIGINT NOT NULL DEFAULT 0,
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                upvotes BIGINT NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
                downvotes BIGINT NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id)
            );
            CREATE INDEX idx_faqs_tenant_order ON faqs(tenant_id, sort_order);
            CREATE TABLE IF NOT EXISTS faq_feedback (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                faq_id BIGINT NOT NULL,
                user_id BIGINT,
                session_id VARCHAR(128),
                is_helpful BOOLEAN NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (faq_id) REFERENCES faqs(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE KEY uq_faq_feedback_user (faq_id, user_id),
                UNIQUE KEY uq_faq_feedback_session (faq_id, session_id)
            );
            CREATE TABLE IF NOT EXISTS article_faqs (
                article_id BIGINT NOT NULL,
                faq_id BIGINT NOT NULL,
                sort_order BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (article_id, faq_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (faq_id) REFERENCES faqs(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 8,
        name: "create_engagement",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS analytics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                event_type VARCHAR(20) NOT NULL DEFAULT 'view',
                visitor_id VARCHAR(128),
                referrer VARCHAR(1000),
                occurred_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (article_id) REFERENCES articles(id)
            );
            CREATE INDEX IF NOT EXISTS idx_analytics_tenant_occurred ON analytics(tenant_id, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_analytics_article_id ON analytics(article_id);
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                parent_id INTEGER,
                content TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'approved', 'spam')),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_article_status ON comments(article_id, status);
            CREATE TABLE IF NOT EXISTS article_likes (
                article_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (article_id, user_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS favorites (
                article_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (article_id, user_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_favorites_user_id ON favorites(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS analytics (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                event_type VARCHAR(20) NOT NULL DEFAULT 'view',
                visitor_id VARCHAR(128),
                referrer VARCHAR(1000),
                occurred_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (article_id) REFERENCES articles(id)
            );
            CREATE INDEX idx_analytics_tenant_occurred ON analytics(tenant_id, occurred_at);
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tenant_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                parent_id BIGINT,
                content TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'approved', 'spam')),
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (tenant_id) REFERENCES tenants(id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_comments_article_status ON comments(article_id, status);
            CREATE TABLE IF NOT EXISTS article_likes (
                article_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (article_id, user_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS favorites (
                article_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (article_id, user_id),
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_favorites_user_id ON favorites(user_id);
        "#,
    },
];

impl Migration {
    fn sql(&self, driver: DatabaseDriver) -> &'static str {
        match driver {
            DatabaseDriver::Sqlite => self.up_sqlite,
            DatabaseDriver::Mysql => self.up_mysql,
        }
    }
}

/// Bring the schema up to date, returning how many migrations were applied
///
/// On SQLite each migration runs in its own transaction, so a failing
/// statement leaves no partial schema behind. MySQL commits DDL implicitly
/// and applies statements one by one.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;

    let newest_known = MIGRATIONS.last().map_or(0, |m| m.version);
    if let Some(newest_applied) = applied.iter().max().filter(|v| **v > newest_known) {
        tracing::warn!(
            "Database is at migration {} but this build only knows up to {}",
            newest_applied,
            newest_known
        );
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();
    if pending.is_empty() {
        tracing::debug!("Schema is up to date");
        return Ok(0);
    }
    tracing::info!("{} pending migration(s)", pending.len());

    for migration in &pending {
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration {} ({})", migration.version, migration.name))?;
    }
    Ok(pending.len())
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let version_type = match pool.driver() {
        DatabaseDriver::Sqlite => "INTEGER",
        DatabaseDriver::Mysql => "INT",
    };
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS _migrations (\
            version {} PRIMARY KEY, \
            name VARCHAR(255) NOT NULL UNIQUE, \
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP\
        )",
        version_type
    );
    pool.execute(&sql).await?;
    Ok(())
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<HashSet<i32>> {
    let versions: Vec<i32> = match pool.driver() {
        DatabaseDriver::Sqlite => sqlx::query_scalar::<_, i32>(APPLIED_VERSIONS)
            .fetch_all(pool.sqlite()?)
            .await,
        DatabaseDriver::Mysql => sqlx::query_scalar::<_, i32>(APPLIED_VERSIONS)
            .fetch_all(pool.mysql()?)
            .await,
    }
    .context("Failed to read applied migrations")?;
    Ok(versions.into_iter().collect())
}

const APPLIED_VERSIONS: &str = "SELECT version FROM _migrations ORDER BY version";
const RECORD_MIGRATION: &str = "INSERT INTO _migrations (version, name) VALUES (?, ?)";

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let statements = split_sql_statements(migration.sql(pool.driver()));
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            let mut tx = pool.sqlite()?.begin().await?;
            for statement in statements {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
            }
            sqlx::query(RECORD_MIGRATION)
                .bind(migration.version)
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }
        DatabaseDriver::Mysql => {
            let mysql = pool.mysql()?;
            for statement in statements {
                sqlx::query(statement)
                    .execute(mysql)
                    .await
                    .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
            }
            sqlx::query(RECORD_MIGRATION)
                .bind(migration.version)
                .bind(migration.name)
                .execute(mysql)
                .await?;
        }
    }
    Ok(())
}

/// First 100 characters of a statement, for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((end, _)) => format!("{}...", &sql[..end]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use sqlx::Row;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Running again should apply 0 migrations
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_failed_migration_leaves_no_partial_schema() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        create_migrations_table(&pool).await.unwrap();
        let broken = Migration {
            version: 900,
            name: "broken",
            up_sqlite: "CREATE TABLE half_done (id INTEGER); INSERT INTO missing_table VALUES (1);",
            up_mysql: "",
        };

        assert!(apply_migration(&pool, &broken).await.is_err());

        let tables: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'half_done'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(tables, 0);
        assert!(applied_versions(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_applied_version_is_tolerated() {
        let pool = migrated_pool().await;
        pool.execute("INSERT INTO _migrations (version, name) VALUES (999, 'from_a_newer_build')")
            .await
            .unwrap();

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
        assert!(applied_versions(&pool).await.unwrap().contains(&999));
    }

    #[tokio::test]
    async fn test_default_tenant_seeded() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let row = sqlx::query("SELECT name FROM tenants WHERE slug = 'default'")
            .fetch_one(sqlite_pool)
            .await
            .expect("Default tenant should exist");
        let name: String = row.get("name");
        assert_eq!(name, "Default");
    }

    #[tokio::test]
    async fn test_default_tiers_seeded() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let rows = sqlx::query(
            "SELECT slug, monthly_article_quota, price_cents FROM subscription_tiers ORDER BY price_cents",
        )
        .fetch_all(sqlite_pool)
        .await
        .unwrap();

        let tiers: Vec<(String, Option<i64>, i64)> = rows
            .iter()
            .map(|r| (r.get("slug"), r.get("monthly_article_quota"), r.get("price_cents")))
            .collect();
        assert_eq!(
            tiers,
            vec![
                ("starter".to_string(), Some(4), 9900),
                ("growth".to_string(), Some(12), 24900),
                ("enterprise".to_string(), None, 59900),
            ]
        );
    }

    #[tokio::test]
    async fn test_article_status_values() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        for status in ["draft", "scheduled", "published", "archived"] {
            let result = sqlx::query(
                "INSERT INTO articles (tenant_id, slug, title, content, content_html, status) VALUES (1, ?, 'T', 'c', '<p>c</p>', ?)",
            )
            .bind(format!("slug-{}", status))
            .bind(status)
            .execute(sqlite_pool)
            .await;
            assert!(result.is_ok(), "status {} should be accepted", status);
        }

        let result = sqlx::query(
            "INSERT INTO articles (tenant_id, slug, title, content, content_html, status) VALUES (1, 'bad', 'T', 'c', '', 'deleted')",
        )
        .execute(sqlite_pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_article_slug_unique_per_tenant() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO tenants (slug, name) VALUES ('acme', 'Acme')")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let insert = "INSERT INTO articles (tenant_id, slug, title, content, content_html) VALUES (?, 'hello', 'T', 'c', '')";
        sqlx::query(insert).bind(1).execute(sqlite_pool).await.unwrap();
        sqlx::query(insert).bind(2).execute(sqlite_pool).await.unwrap();
        assert!(sqlx::query(insert).bind(1).execute(sqlite_pool).await.is_err());
    }

    #[tokio::test]
    async fn test_article_children_block_parent_delete() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO articles (tenant_id, slug, title, content, content_html) VALUES (1, 'a', 'T', 'c', '')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO analytics (tenant_id, article_id) VALUES (1, 1)")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let result = sqlx::query("DELETE FROM articles WHERE id = 1")
            .execute(sqlite_pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO users (tenant_id, username, email) VALUES (1, 'ann', 'ann@example.com')")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let result = sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES (1, 1)")
            .execute(sqlite_pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_faq_counters_cannot_go_negative() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO faqs (tenant_id, question, answer) VALUES (1, 'Q', 'A')")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let result = sqlx::query("UPDATE faqs SET upvotes = -1 WHERE id = 1")
            .execute(sqlite_pool)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, index as i32 + 1);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);

        let sql = "-- leading comment only;\nCREATE TABLE c (id INT)";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["CREATE TABLE c (id INT)"]);
    }

    #[test]
    fn test_truncate_sql_respects_char_boundaries() {
        let short = "SELECT 1";
        assert_eq!(truncate_sql(short), short);

        let long = "é".repeat(150);
        let truncated = truncate_sql(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 103);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- just a comment"));
        assert!(is_comment_only("  \n-- one\n  -- two"));
        assert!(!is_comment_only("SELECT 1"));
    }
}
