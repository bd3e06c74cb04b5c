//! User service
//!
//! Staff and reader accounts, public profiles and the follow graph.
//! Credentials are handled outside this service.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::db::repositories::UserRepository;
use crate::models::{
    CreateUserInput, ListParams, PagedResult, UpdateProfileInput, User, UserProfile, UserSummary,
};
use crate::services::{is_valid_email, non_blank, ServiceError, ServiceResult};

const USERNAME_MAX: usize = 50;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, tenant_id: i64, input: CreateUserInput) -> ServiceResult<User> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();
        validate_username(&username)?;
        if !is_valid_email(&email) {
            return Err(ServiceError::validation(format!("Invalid email address: {}", email)));
        }

        if self
            .repo
            .exists(tenant_id, &username, &email)
            .await
            .context("Failed to check user uniqueness")?
        {
            return Err(ServiceError::conflict("Username or email already registered"));
        }

        let now = Utc::now();
        let user = User {
            id: 0,
            tenant_id,
            username,
            email,
            display_name: non_blank(input.display_name),
            bio: None,
            avatar: None,
            role: input.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let user = self.repo.create(&user).await.context("Failed to create user")?;
        tracing::info!("Created {} user {} on tenant {}", user.role, user.username, tenant_id);
        Ok(user)
    }

    pub async fn get(&self, tenant_id: i64, id: i64) -> ServiceResult<User> {
        self.repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn list(&self, tenant_id: i64, params: &ListParams) -> ServiceResult<PagedResult<User>> {
        let (users, total) = self
            .repo
            .list(tenant_id, params)
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Public profile with follower, following, article and favorite counts
    pub async fn get_profile(&self, tenant_id: i64, username: &str) -> ServiceResult<UserProfile> {
        let user = self
            .repo
            .get_by_username(tenant_id, username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        self.profile_of(user).await
    }

    pub async fn update_profile(
        &self,
        tenant_id: i64,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> ServiceResult<UserProfile> {
        let mut user = self.get(tenant_id, user_id).await?;
        if input.has_changes() {
            if input.display_name.is_some() {
                user.display_name = non_blank(input.display_name);
            }
            if input.bio.is_some() {
                user.bio = non_blank(input.bio);
            }
            if input.avatar.is_some() {
                user.avatar = non_blank(input.avatar);
            }
            user = self
                .repo
                .update_profile(&user)
                .await
                .context("Failed to update profile")?;
        }
        self.profile_of(user).await
    }

    /// Follow another user. Following twice is a no-op.
    pub async fn follow(&self, tenant_id: i64, follower_id: i64, following_id: i64) -> ServiceResult<bool> {
        if follower_id == following_id {
            return Err(ServiceError::validation("Users cannot follow themselves"));
        }
        self.get(tenant_id, follower_id).await?;
        self.get(tenant_id, following_id).await?;

        Ok(self
            .repo
            .follow(follower_id, following_id)
            .await
            .context("Failed to follow user")?)
    }

    pub async fn unfollow(&self, tenant_id: i64, follower_id: i64, following_id: i64) -> ServiceResult<bool> {
        if follower_id == following_id {
            return Err(ServiceError::validation("Users cannot follow themselves"));
        }
        self.get(tenant_id, following_id).await?;

        Ok(self
            .repo
            .unfollow(follower_id, following_id)
            .await
            .context("Failed to unfollow user")?)
    }

    pub async fn list_followers(
        &self,
        tenant_id: i64,
        user_id: i64,
        params: &ListParams,
    ) -> ServiceResult<Vec<UserSummary>> {
        self.get(tenant_id, user_id).await?;
        Ok(self
            .repo
            .list_followers(user_id, params)
            .await
            .context("Failed to list followers")?)
    }

    pub async fn list_following(
        &self,
        tenant_id: i64,
        user_id: i64,
        params: &ListParams,
    ) -> ServiceResult<Vec<UserSummary>> {
        self.get(tenant_id, user_id).await?;
        Ok(self
            .repo
            .list_following(user_id, params)
            .await
            .context("Failed to list following")?)
    }

    async fn profile_of(&self, user: User) -> ServiceResult<UserProfile> {
        let counts = self
            .repo
            .profile_counts(user.id)
            .await
            .context("Failed to load profile counts")?;

        Ok(UserProfile {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            avatar: user.avatar,
            role: user.role,
            joined_at: user.created_at,
            follower_count: counts.followers,
            following_count: counts.following,
            article_count: counts.published_articles,
            favorite_count: counts.favorites,
        })
    }
}

fn validate_username(username: &str) -> ServiceResult<()> {
    if username.is_empty() {
        return Err(ServiceError::validation("Username cannot be empty"));
    }
    if username.chars().count() > USERNAME_MAX {
        return Err(ServiceError::validation(format!(
            "Username cannot exceed {} characters",
            USERNAME_MAX
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ServiceError::validation(
            "Username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}
