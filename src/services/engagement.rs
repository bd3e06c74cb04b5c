//! Engagement service
//!
//! Reader interaction with published articles:
//! - Threaded comments with optional pre-moderation
//! - Likes, kept in step with `articles.like_count`
//! - Favorites and the reader's favorites list
//!
//! Only published articles accept engagement.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::{
    ArticleRepository, CommentRepository, EngagementRepository, UserRepository,
};
use crate::models::{
    Article, ArticleSummary, Comment, CommentStatus, CommentThread, CreateCommentInput,
    FavoriteResult, LikeResult, ListParams, PagedResult, UserSummary,
};
use crate::services::{ServiceError, ServiceResult};

const COMMENT_MAX_CHARS: usize = 5000;

pub struct EngagementService {
    comment_repo: Arc<dyn CommentRepository>,
    engagement_repo: Arc<dyn EngagementRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    user_repo: Arc<dyn UserRepository>,
    cache: Arc<MemoryCache>,
    /// New comments wait for approval when set
    moderation: bool,
}

impl EngagementService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        engagement_repo: Arc<dyn EngagementRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        user_repo: Arc<dyn UserRepository>,
        cache: Arc<MemoryCache>,
        moderation: bool,
    ) -> Self {
        Self {
            comment_repo,
            engagement_repo,
            article_repo,
            user_repo,
            cache,
            moderation,
        }
    }

    /// Post a comment or a reply
    ///
    /// Replies must point at a comment on the same article. The comment is
    /// approved immediately unless moderation is on.
    pub async fn create_comment(
        &self,
        tenant_id: i64,
        article_id: i64,
        user_id: i64,
        input: CreateCommentInput,
    ) -> ServiceResult<Comment> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ServiceError::validation("Comment cannot be empty"));
        }
        if content.chars().count() > COMMENT_MAX_CHARS {
            return Err(ServiceError::validation(format!(
                "Comment cannot exceed {} characters",
                COMMENT_MAX_CHARS
            )));
        }

        let article = self.published_article(tenant_id, article_id).await?;
        self.ensure_user(tenant_id, user_id).await?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comment_repo
                .get_by_id(tenant_id, parent_id)
                .await
                .context("Failed to get parent comment")?;
            if parent.map(|p| p.article_id) != Some(article.id) {
                return Err(ServiceError::validation(
                    "Replies must belong to a comment on the same article",
                ));
            }
        }

        let now = Utc::now();
        let status = if self.moderation {
            CommentStatus::Pending
        } else {
            CommentStatus::Approved
        };
        let comment = Comment {
            id: 0,
            tenant_id,
            article_id: article.id,
            user_id,
            parent_id: input.parent_id,
            content,
            status,
            created_at: now,
            updated_at: now,
        };
        let comment = self
            .comment_repo
            .create(&comment)
            .await
            .context("Failed to create comment")?;
        tracing::info!(
            "Comment {} on article {} by user {} is {}",
            comment.id,
            article.id,
            user_id,
            comment.status
        );

        self.refresh_comment_count(tenant_id, article.id).await?;
        Ok(comment)
    }

    /// Approved comments of a published article as reply trees, oldest first
    pub async fn comment_threads(&self, tenant_id: i64, article_id: i64) -> ServiceResult<Vec<CommentThread>> {
        let article = self.published_article(tenant_id, article_id).await?;
        let comments = self
            .comment_repo
            .list_for_article(article.id, Some(CommentStatus::Approved))
            .await
            .context("Failed to list comments")?;
        Ok(build_threads(comments))
    }

    /// Moderation queue
    pub async fn list_comments(
        &self,
        tenant_id: i64,
        status: Option<CommentStatus>,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Comment>> {
        let (items, total) = self
            .comment_repo
            .list(tenant_id, status, params)
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn moderate_comment(&self, tenant_id: i64, id: i64, status: CommentStatus) -> ServiceResult<Comment> {
        let comment = self.get_comment(tenant_id, id).await?;
        self.comment_repo
            .update_status(tenant_id, id, status)
            .await
            .context("Failed to update comment status")?;
        tracing::info!("Comment {} moved from {} to {}", id, comment.status, status);

        self.refresh_comment_count(tenant_id, comment.article_id).await?;
        self.get_comment(tenant_id, id).await
    }

    /// Delete a comment and its replies
    pub async fn delete_comment(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        let comment = self.get_comment(tenant_id, id).await?;
        self.comment_repo
            .delete(tenant_id, id)
            .await
            .context("Failed to delete comment")?;
        self.refresh_comment_count(tenant_id, comment.article_id).await?;
        Ok(())
    }

    /// Like a published article, or remove the like
    pub async fn toggle_like(&self, tenant_id: i64, article_id: i64, user_id: i64) -> ServiceResult<LikeResult> {
        let article = self.published_article(tenant_id, article_id).await?;
        self.ensure_user(tenant_id, user_id).await?;
        let result = self
            .engagement_repo
            .toggle_like(article.id, user_id)
            .await
            .context("Failed to toggle like")?;
        self.invalidate(tenant_id).await;
        Ok(result)
    }

    pub async fn is_liked(&self, tenant_id: i64, article_id: i64, user_id: i64) -> ServiceResult<bool> {
        let article = self.published_article(tenant_id, article_id).await?;
        Ok(self
            .engagement_repo
            .is_liked(article.id, user_id)
            .await
            .context("Failed to check like")?)
    }

    pub async fn toggle_favorite(
        &self,
        tenant_id: i64,
        article_id: i64,
        user_id: i64,
    ) -> ServiceResult<FavoriteResult> {
        let article = self.published_article(tenant_id, article_id).await?;
        self.ensure_user(tenant_id, user_id).await?;
        Ok(self
            .engagement_repo
            .toggle_favorite(article.id, user_id)
            .await
            .context("Failed to toggle favorite")?)
    }

    /// A reader's favorited articles that are still published
    pub async fn list_favorites(
        &self,
        tenant_id: i64,
        user_id: i64,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<ArticleSummary>> {
        self.ensure_user(tenant_id, user_id).await?;
        let (items, total) = self
            .engagement_repo
            .list_favorites(user_id, params)
            .await
            .context("Failed to list favorites")?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn published_article(&self, tenant_id: i64, article_id: i64) -> ServiceResult<Article> {
        self.article_repo
            .get_by_id(tenant_id, article_id)
            .await
            .context("Failed to get article")?
            .filter(Article::is_published)
            .ok_or_else(|| ServiceError::not_found("Article"))
    }

    async fn ensure_user(&self, tenant_id: i64, user_id: i64) -> ServiceResult<()> {
        self.user_repo
            .get_by_id(tenant_id, user_id)
            .await
            .context("Failed to get user")?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn get_comment(&self, tenant_id: i64, id: i64) -> ServiceResult<Comment> {
        self.comment_repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| ServiceError::not_found("Comment"))
    }

    async fn refresh_comment_count(&self, tenant_id: i64, article_id: i64) -> ServiceResult<()> {
        self.comment_repo
            .recompute_comment_count(article_id)
            .await
            .context("Failed to refresh comment count")?;
        self.invalidate(tenant_id).await;
        Ok(())
    }

    async fn invalidate(&self, tenant_id: i64) {
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
}

/// Nest comments under their parents, keeping input order at every level.
/// Replies whose parent is not in the list are dropped.
fn build_threads(comments: Vec<(Comment, UserSummary)>) -> Vec<CommentThread> {
    let mut children: HashMap<Option<i64>, Vec<(Comment, UserSummary)>> = HashMap::new();
    for (comment, author) in comments {
        children.entry(comment.parent_id).or_default().push((comment, author));
    }

    fn attach(
        parent: Option<i64>,
        children: &mut HashMap<Option<i64>, Vec<(Comment, UserSummary)>>,
    ) -> Vec<CommentThread> {
        let level = children.remove(&parent).unwrap_or_default();
        level
            .into_iter()
            .map(|(comment, author)| {
                let replies = attach(Some(comment.id), children);
                CommentThread {
                    comment,
                    author,
                    replies,
                }
            })
            .collect()
    }

    attach(None, &mut children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxCommentRepository, SqlxEngagementRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup(moderation: bool) -> (DynDatabasePool, EngagementService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool.execute(
            "INSERT INTO users (tenant_id, username, email) VALUES (1, 'ada', 'ada@example.com'), (1, 'bob', 'bob@example.com')",
        )
        .await
        .unwrap();
        pool.execute(
            "INSERT INTO articles (tenant_id, slug, title, content, content_html, status) \
             VALUES (1, 'live', 'Live', 'c', '', 'published'), (1, 'draft', 'Draft', 'c', '', 'draft')",
        )
        .await
        .unwrap();

        let service = EngagementService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxEngagementRepository::boxed(pool.clone()),
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            create_cache(&CacheConfig::default()),
            moderation,
        );
        (pool, service)
    }

    fn comment(content: &str, parent_id: Option<i64>) -> CreateCommentInput {
        CreateCommentInput {
            content: content.to_string(),
            parent_id,
        }
    }

    async fn comment_count(pool: &DynDatabasePool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT comment_count FROM articles WHERE id = 1")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_comments_form_threads() {
        let (pool, service) = setup(false).await;
        let root = service.create_comment(1, 1, 1, comment("First!", None)).await.unwrap();
        assert_eq!(root.status, CommentStatus::Approved);
        let reply = service
            .create_comment(1, 1, 2, comment("Reply", Some(root.id)))
            .await
            .unwrap();
        service
            .create_comment(1, 1, 1, comment("Nested", Some(reply.id)))
            .await
            .unwrap();
        service.create_comment(1, 1, 2, comment("Second", None)).await.unwrap();

        let threads = service.comment_threads(1, 1).await.unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.content, "First!");
        assert_eq!(threads[0].author.username, "ada");
        assert_eq!(threads[0].replies[0].comment.content, "Reply");
        assert_eq!(threads[0].replies[0].replies[0].comment.content, "Nested");
        assert!(threads[1].replies.is_empty());
        assert_eq!(comment_count(&pool).await, 4);
    }

    #[tokio::test]
    async fn test_moderation_hides_until_approved() {
        let (pool, service) = setup(true).await;
        let pending = service.create_comment(1, 1, 1, comment("Hello", None)).await.unwrap();
        assert_eq!(pending.status, CommentStatus::Pending);
        assert!(service.comment_threads(1, 1).await.unwrap().is_empty());
        assert_eq!(comment_count(&pool).await, 0);

        let queue = service
            .list_comments(1, Some(CommentStatus::Pending), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(queue.total, 1);

        let approved = service
            .moderate_comment(1, pending.id, CommentStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, CommentStatus::Approved);
        assert_eq!(service.comment_threads(1, 1).await.unwrap().len(), 1);
        assert_eq!(comment_count(&pool).await, 1);

        service.moderate_comment(1, pending.id, CommentStatus::Spam).await.unwrap();
        assert_eq!(comment_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let (_pool, service) = setup(false).await;
        assert!(matches!(
            service.create_comment(1, 1, 1, comment("  ", None)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create_comment(1, 2, 1, comment("On a draft", None)).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.create_comment(1, 1, 99, comment("Ghost", None)).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.create_comment(1, 1, 1, comment("Orphan", Some(42))).await,
            Err(ServiceError::Validation(_))
        ));
        let long = "x".repeat(COMMENT_MAX_CHARS + 1);
        assert!(matches!(
            service.create_comment(1, 1, 1, comment(&long, None)).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_comment_updates_count() {
        let (pool, service) = setup(false).await;
        let first = service.create_comment(1, 1, 1, comment("One", None)).await.unwrap();
        service.create_comment(1, 1, 2, comment("Two", None)).await.unwrap();
        assert_eq!(comment_count(&pool).await, 2);

        service.delete_comment(1, first.id).await.unwrap();
        assert_eq!(comment_count(&pool).await, 1);
        assert!(matches!(
            service.delete_comment(1, first.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_count() {
        let (_pool, service) = setup(false).await;
        let liked = service.toggle_like(1, 1, 1).await.unwrap();
        assert_eq!(liked, LikeResult { liked: true, like_count: 1 });
        assert!(service.is_liked(1, 1, 1).await.unwrap());

        let unliked = service.toggle_like(1, 1, 1).await.unwrap();
        assert_eq!(unliked, LikeResult { liked: false, like_count: 0 });
        assert!(!service.is_liked(1, 1, 1).await.unwrap());

        assert!(matches!(service.toggle_like(1, 2, 1).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_favorites() {
        let (_pool, service) = setup(false).await;
        assert!(service.toggle_favorite(1, 1, 1).await.unwrap().favorited);
        let favorites = service.list_favorites(1, 1, &ListParams::default()).await.unwrap();
        assert_eq!(favorites.total, 1);
        assert_eq!(favorites.items[0].slug, "live");

        assert!(!service.toggle_favorite(1, 1, 1).await.unwrap().favorited);
        let favorites = service.list_favorites(1, 1, &ListParams::default()).await.unwrap();
        assert_eq!(favorites.total, 0);
    }

    #[test]
    fn test_build_threads_drops_orphans() {
        let now = Utc::now();
        let make = |id: i64, parent_id: Option<i64>| {
            (
                Comment {
                    id,
                    tenant_id: 1,
                    article_id: 1,
                    user_id: 1,
                    parent_id,
                    content: format!("c{}", id),
                    status: CommentStatus::Approved,
                    created_at: now,
                    updated_at: now,
                },
                UserSummary {
                    id: 1,
                    username: "ada".to_string(),
                    display_name: None,
                    avatar: None,
                },
            )
        };

        let threads = build_threads(vec![make(1, None), make(2, Some(1)), make(3, Some(9)), make(4, None)]);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].replies.len(), 1);
        assert_eq!(threads[1].comment.id, 4);
    }
}
