//! User repository
//!
//! Database operations for users and the follow graph between them.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User, UserRole, UserSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Social counters shown on a profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub followers: i64,
    pub following: i64,
    pub published_articles: i64,
    pub favorites: i64,
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID within a tenant
    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<User>>;

    /// Get user by username within a tenant
    async fn get_by_username(&self, tenant_id: i64, username: &str) -> Result<Option<User>>;

    /// Check whether a username or email is already registered in the tenant
    async fn exists(&self, tenant_id: i64, username: &str, email: &str) -> Result<bool>;

    /// List users with pagination, returning the page and the total
    async fn list(&self, tenant_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)>;

    /// Update profile fields (display name, bio, avatar)
    async fn update_profile(&self, user: &User) -> Result<User>;

    /// Follow a user. Returns false when the follow already existed.
    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Unfollow a user. Returns false when there was no follow.
    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Users following `user_id`, most recent first
    async fn list_followers(&self, user_id: i64, params: &ListParams) -> Result<Vec<UserSummary>>;

    /// Users `user_id` follows, most recent first
    async fn list_following(&self, user_id: i64, params: &ListParams) -> Result<Vec<UserSummary>>;

    /// Counters for a profile page
    async fn profile_counts(&self, user_id: i64) -> Result<ProfileCounts>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str =
    "id, tenant_id, username, email, display_name, bio, avatar, role, created_at, updated_at";

const INSERT_USER: &str = r#"
    INSERT INTO users (tenant_id, username, email, display_name, bio, avatar, role, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const EXISTS_USER: &str =
    "SELECT COUNT(*) AS count FROM users WHERE tenant_id = ? AND (username = ? OR email = ?)";

const UPDATE_PROFILE: &str =
    "UPDATE users SET display_name = ?, bio = ?, avatar = ?, updated_at = ? WHERE tenant_id = ? AND id = ?";

const DELETE_FOLLOW: &str = "DELETE FROM follows WHERE follower_id = ? AND following_id = ?";

const LIST_FOLLOWERS: &str = r#"
    SELECT u.id, u.username, u.display_name, u.avatar
    FROM follows f
    INNER JOIN users u ON u.id = f.follower_id
    WHERE f.following_id = ?
    ORDER BY f.created_at DESC, u.id DESC
    LIMIT ? OFFSET ?
"#;

const LIST_FOLLOWING: &str = r#"
    SELECT u.id, u.username, u.display_name, u.avatar
    FROM follows f
    INNER JOIN users u ON u.id = f.following_id
    WHERE f.follower_id = ?
    ORDER BY f.created_at DESC, u.id DESC
    LIMIT ? OFFSET ?
"#;

const PROFILE_COUNTS: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM follows WHERE following_id = ?) AS followers,
        (SELECT COUNT(*) FROM follows WHERE follower_id = ?) AS following,
        (SELECT COUNT(*) FROM articles WHERE author_id = ? AND status = 'published') AS published_articles,
        (SELECT COUNT(*) FROM favorites WHERE user_id = ?) AS favorites
"#;

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE tenant_id = ? AND id = ?", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(tenant_id)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(tenant_id)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_username(&self, tenant_id: i64, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE tenant_id = ? AND username = ?", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(tenant_id)
                    .bind(username)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get user by username")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(tenant_id)
                    .bind(username)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get user by username")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn exists(&self, tenant_id: i64, username: &str, email: &str) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(EXISTS_USER)
                .bind(tenant_id)
                .bind(username)
                .bind(email)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check user existence")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(EXISTS_USER)
                .bind(tenant_id)
                .bind(username)
                .bind(email)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check user existence")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list(&self, tenant_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_users_sqlite(self.pool.sqlite()?, tenant_id, params).await,
            DatabaseDriver::Mysql => list_users_mysql(self.pool.mysql()?, tenant_id, params).await,
        }
    }

    async fn update_profile(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_PROFILE)
                    .bind(&user.display_name)
                    .bind(&user.bio)
                    .bind(&user.avatar)
                    .bind(now)
                    .bind(user.tenant_id)
                    .bind(user.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update profile")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_PROFILE)
                    .bind(&user.display_name)
                    .bind(&user.bio)
                    .bind(&user.avatar)
                    .bind(now)
                    .bind(user.tenant_id)
                    .bind(user.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update profile")?;
            }
        }
        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(
                "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(follower_id)
            .bind(following_id)
            .bind(now)
            .execute(self.pool.sqlite()?)
            .await
            .context("Failed to follow user")?
            .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(
                "INSERT IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(follower_id)
            .bind(following_id)
            .bind(now)
            .execute(self.pool.mysql()?)
            .await
            .context("Failed to follow user")?
            .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_FOLLOW)
                .bind(follower_id)
                .bind(following_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to unfollow user")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(DELETE_FOLLOW)
                .bind(follower_id)
                .bind(following_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to unfollow user")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_followers(&self, user_id: i64, params: &ListParams) -> Result<Vec<UserSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_summaries_sqlite(self.pool.sqlite()?, LIST_FOLLOWERS, user_id, params).await
            }
            DatabaseDriver::Mysql => {
                list_summaries_mysql(self.pool.mysql()?, LIST_FOLLOWERS, user_id, params).await
            }
        }
    }

    async fn list_following(&self, user_id: i64, params: &ListParams) -> Result<Vec<UserSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_summaries_sqlite(self.pool.sqlite()?, LIST_FOLLOWING, user_id, params).await
            }
            DatabaseDriver::Mysql => {
                list_summaries_mysql(self.pool.mysql()?, LIST_FOLLOWING, user_id, params).await
            }
        }
    }

    async fn profile_counts(&self, user_id: i64) -> Result<ProfileCounts> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(PROFILE_COUNTS)
                    .bind(user_id)
                    .bind(user_id)
                    .bind(user_id)
                    .bind(user_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to load profile counts")?;
                Ok(ProfileCounts {
                    followers: row.get("followers"),
                    following: row.get("following"),
                    published_articles: row.get("published_articles"),
                    favorites: row.get("favorites"),
                })
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(PROFILE_COUNTS)
                    .bind(user_id)
                    .bind(user_id)
                    .bind(user_id)
                    .bind(user_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to load profile counts")?;
                Ok(ProfileCounts {
                    followers: row.get("followers"),
                    following: row.get("following"),
                    published_articles: row.get("published_articles"),
                    favorites: row.get("favorites"),
                })
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_USER)
        .bind(user.tenant_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn list_users_sqlite(pool: &SqlitePool, tenant_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
    let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE tenant_id = ?")
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("count");

    let sql = format!(
        "SELECT {} FROM users WHERE tenant_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(tenant_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let users = rows.iter().map(row_to_user_sqlite).collect::<Result<Vec<_>>>()?;
    Ok((users, total))
}

async fn list_summaries_sqlite(
    pool: &SqlitePool,
    sql: &str,
    user_id: i64,
    params: &ListParams,
) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query(sql)
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list follows")?;

    Ok(rows
        .iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            avatar: row.get("avatar"),
        })
        .collect())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role: UserRole = role_str.parse().map_err(anyhow::Error::msg)?;

    Ok(User {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        username: row.get("username"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        bio: row.get("bio"),
        avatar: row.get("avatar"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_USER)
        .bind(user.tenant_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn list_users_mysql(pool: &MySqlPool, tenant_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
    let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE tenant_id = ?")
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("count");

    let sql = format!(
        "SELECT {} FROM users WHERE tenant_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(tenant_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let users = rows.iter().map(row_to_user_mysql).collect::<Result<Vec<_>>>()?;
    Ok((users, total))
}

async fn list_summaries_mysql(
    pool: &MySqlPool,
    sql: &str,
    user_id: i64,
    params: &ListParams,
) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query(sql)
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list follows")?;

    Ok(rows
        .iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            avatar: row.get("avatar"),
        })
        .collect())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role: UserRole = role_str.parse().map_err(anyhow::Error::msg)?;

    Ok(User {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        username: row.get("username"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        bio: row.get("bio"),
        avatar: row.get("avatar"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn new_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: 0,
            tenant_id: 1,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            display_name: None,
            bio: None,
            avatar: None,
            role: UserRole::Reader,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_user("ada")).await.expect("Failed to create user");
        assert!(created.id > 0);

        let by_name = repo.get_by_username(1, "ada").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.role, UserRole::Reader);

        assert!(repo.exists(1, "ada", "other@example.com").await.unwrap());
        assert!(repo.exists(1, "other", "ada@example.com").await.unwrap());
        assert!(!repo.exists(1, "other", "other@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&new_user("ada")).await.unwrap();
        assert!(repo.create(&new_user("ada")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_users_paginated() {
        let repo = setup_test_repo().await;
        for i in 0..5 {
            repo.create(&new_user(&format!("user{}", i))).await.unwrap();
        }

        let (page, total) = repo.list(1, &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let repo = setup_test_repo().await;
        let ada = repo.create(&new_user("ada")).await.unwrap();
        let bob = repo.create(&new_user("bob")).await.unwrap();

        assert!(repo.follow(ada.id, bob.id).await.unwrap());
        assert!(!repo.follow(ada.id, bob.id).await.unwrap());

        let followers = repo.list_followers(bob.id, &ListParams::default()).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "ada");

        let following = repo.list_following(ada.id, &ListParams::default()).await.unwrap();
        assert_eq!(following[0].username, "bob");

        let counts = repo.profile_counts(bob.id).await.unwrap();
        assert_eq!(counts.followers, 1);
        assert_eq!(counts.following, 0);

        assert!(repo.unfollow(ada.id, bob.id).await.unwrap());
        assert!(!repo.unfollow(ada.id, bob.id).await.unwrap());
        assert_eq!(repo.profile_counts(bob.id).await.unwrap().followers, 0);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = setup_test_repo().await;
        let mut user = repo.create(&new_user("ada")).await.unwrap();
        user.display_name = Some("Ada L.".to_string());
        user.bio = Some("Analyst".to_string());
        repo.update_profile(&user).await.unwrap();

        let found = repo.get_by_id(1, user.id).await.unwrap().unwrap();
        assert_eq!(found.display_name.as_deref(), Some("Ada L."));
        assert_eq!(found.bio.as_deref(), Some("Analyst"));
    }
}
