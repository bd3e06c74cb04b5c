//! Article service
//!
//! Implements business logic for article management:
//! - Create, read, update, delete articles
//! - Markdown rendering and SEO scoring on every save
//! - Version snapshots and restore
//! - Tag, related-article and FAQ links
//! - Client activity and quota checks
//! - The publish action used by the editor form
//!
//! Every write drops the tenant's cache namespace.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{invalidate_tenant, tenant_key, CacheLayer, MemoryCache};
use crate::db::repositories::{
    ArticleRepository, CategoryRepository, FaqRepository, TagRepository, UserRepository,
};
use crate::models::{
    Article, ArticleDetail, ArticleFilter, ArticleStatus, ArticleVersion, CreateArticleInput,
    ListParams, PagedResult, Tag, UpdateArticleInput,
};
use crate::services::client::ClientService;
use crate::services::markdown::MarkdownRenderer;
use crate::services::seo::{analyze_article_seo, SeoAnalysis, SeoInput};
use crate::services::slug::generate_slug;
use crate::services::{non_blank, ServiceError, ServiceResult};

const CACHE_KEY_ARTICLE_BY_SLUG: &str = "article:slug:";

/// Body of the editor's publish action. Field names follow the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishForm {
    /// Existing article to update; a new one is created when absent
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub focus_keyword: Option<String>,
    pub featured_image: Option<String>,
    pub featured_image_alt: Option<String>,
    pub client_id: Option<i64>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    pub tags: Option<Vec<String>>,
    /// A future time schedules the article instead of publishing it
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Result of the publish action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishOutcome {
    pub article_id: i64,
    pub status: ArticleStatus,
}

/// Article service for managing tenant content
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    tag_repo: Arc<dyn TagRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    user_repo: Arc<dyn UserRepository>,
    faq_repo: Arc<dyn FaqRepository>,
    clients: Arc<ClientService>,
    cache: Arc<MemoryCache>,
    markdown_renderer: MarkdownRenderer,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        tag_repo: Arc<dyn TagRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        user_repo: Arc<dyn UserRepository>,
        faq_repo: Arc<dyn FaqRepository>,
        clients: Arc<ClientService>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            category_repo,
            user_repo,
            faq_repo,
            clients,
            cache,
            markdown_renderer: MarkdownRenderer::new(),
        }
    }

    /// Create a new article
    ///
    /// # Errors
    /// - `Validation` for a blank title or content, an unknown category or
    ///   author, an inactive client or an exhausted client quota
    /// - `Conflict` if the slug is already used in the tenant
    pub async fn create(&self, tenant_id: i64, input: CreateArticleInput) -> ServiceResult<Article> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::validation("Title cannot be empty"));
        }
        if input.content.trim().is_empty() {
            return Err(ServiceError::validation("Content cannot be empty"));
        }

        let slug = self.unique_slug(tenant_id, input.slug.as_deref(), &title, None).await?;
        self.check_references(tenant_id, input.category_id, input.author_id).await?;
        if let Some(client_id) = input.client_id {
            self.clients.ensure_can_create_article(tenant_id, client_id).await?;
        }

        let now = Utc::now();
        let status = input.status.unwrap_or_default();
        let scheduled_at = input.scheduled_at;
        if status == ArticleStatus::Scheduled && scheduled_at.is_none() {
            return Err(ServiceError::validation("Scheduled articles need a scheduled time"));
        }

        let mut article = Article {
            id: 0,
            tenant_id,
            client_id: input.client_id,
            category_id: input.category_id,
            author_id: input.author_id,
            slug,
            title,
            excerpt: non_blank(input.excerpt),
            content: input.content,
            content_html: String::new(),
            meta_title: non_blank(input.meta_title),
            meta_description: non_blank(input.meta_description),
            focus_keyword: non_blank(input.focus_keyword),
            featured_image: non_blank(input.featured_image),
            featured_image_alt: non_blank(input.featured_image_alt),
            status,
            seo_score: 0,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            scheduled_at,
            published_at: (status == ArticleStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
        };
        self.refresh_derived(&mut article);

        let article = self
            .repo
            .create(&article)
            .await
            .context("Failed to create article")?;

        if let Some(names) = input.tags {
            self.replace_tags(tenant_id, article.id, &names).await?;
        }

        tracing::info!(
            "Created article {} ({}) on tenant {} with SEO score {}",
            article.id,
            article.slug,
            tenant_id,
            article.seo_score
        );
        self.invalidate(tenant_id).await;
        Ok(article)
    }

    pub async fn get(&self, tenant_id: i64, id: i64) -> ServiceResult<Article> {
        self.repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ServiceError::not_found("Article"))
    }

    /// Reader lookup: only published articles, with related records resolved
    pub async fn get_published_by_slug(&self, tenant_id: i64, slug: &str) -> ServiceResult<ArticleDetail> {
        let cache_key = tenant_key(tenant_id, &format!("{}{}", CACHE_KEY_ARTICLE_BY_SLUG, slug));
        if let Ok(Some(detail)) = self.cache.get::<ArticleDetail>(&cache_key).await {
            return Ok(detail);
        }

        let article = self
            .repo
            .get_by_slug(tenant_id, slug)
            .await
            .context("Failed to get article by slug")?
            .filter(Article::is_published)
            .ok_or_else(|| ServiceError::not_found("Article"))?;

        let detail = self.detail(article).await?;
        if let Err(e) = self.cache.set(&cache_key, &detail, self.cache.default_ttl()).await {
            tracing::warn!("Failed to cache article {}: {}", slug, e);
        }
        Ok(detail)
    }

    async fn detail(&self, article: Article) -> ServiceResult<ArticleDetail> {
        let category = match article.category_id {
            Some(id) => self
                .category_repo
                .get_by_id(article.tenant_id, id)
                .await
                .context("Failed to get article category")?,
            None => None,
        };
        let author = match article.author_id {
            Some(id) => self
                .user_repo
                .get_by_id(article.tenant_id, id)
                .await
                .context("Failed to get article author")?
                .map(|user| user.summary()),
            None => None,
        };
        let tags = self
            .tag_repo
            .get_by_article_id(article.id)
            .await
            .context("Failed to get article tags")?;
        let faqs = self
            .faq_repo
            .list_for_article(article.id, true)
            .await
            .context("Failed to get article FAQs")?;
        let related = self
            .repo
            .list_related(article.id, true)
            .await
            .context("Failed to get related articles")?;

        Ok(ArticleDetail {
            article,
            category,
            author,
            tags,
            faqs,
            related,
        })
    }

    /// List articles newest first
    pub async fn list(
        &self,
        tenant_id: i64,
        filter: &ArticleFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Article>> {
        let articles = self
            .repo
            .list(tenant_id, filter, params)
            .await
            .context("Failed to list articles")?;
        let total = self
            .repo
            .count(tenant_id, filter)
            .await
            .context("Failed to count articles")?;
        Ok(PagedResult::new(articles, total, params))
    }

    /// Partial update
    ///
    /// Snapshots the current state first when title, content or meta fields
    /// change. HTML and SEO score are recomputed on every update and
    /// `published_at` is stamped on the first transition to published.
    pub async fn update(&self, tenant_id: i64, id: i64, input: UpdateArticleInput) -> ServiceResult<Article> {
        let current = self.get(tenant_id, id).await?;
        let mut article = current.clone();

        if let Some(title) = &input.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ServiceError::validation("Title cannot be empty"));
            }
            article.title = title.to_string();
        }
        if let Some(content) = &input.content {
            if content.trim().is_empty() {
                return Err(ServiceError::validation("Content cannot be empty"));
            }
            article.content = content.clone();
        }
        if let Some(slug) = input.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            article.slug = self
                .unique_slug(tenant_id, Some(slug), &article.title, Some(id))
                .await?;
        }
        if input.excerpt.is_some() {
            article.excerpt = non_blank(input.excerpt.clone());
        }
        if input.meta_title.is_some() {
            article.meta_title = non_blank(input.meta_title.clone());
        }
        if input.meta_description.is_some() {
            article.meta_description = non_blank(input.meta_description.clone());
        }
        if input.focus_keyword.is_some() {
            article.focus_keyword = non_blank(input.focus_keyword.clone());
        }
        if input.featured_image.is_some() {
            article.featured_image = non_blank(input.featured_image.clone());
        }
        if input.featured_image_alt.is_some() {
            article.featured_image_alt = non_blank(input.featured_image_alt.clone());
        }

        self.check_references(tenant_id, input.category_id, input.author_id).await?;
        if let Some(category_id) = input.category_id {
            article.category_id = Some(category_id);
        }
        if let Some(author_id) = input.author_id {
            article.author_id = Some(author_id);
        }
        if let Some(client_id) = input.client_id {
            if current.client_id != Some(client_id) {
                self.clients.ensure_can_create_article(tenant_id, client_id).await?;
            }
            article.client_id = Some(client_id);
        }
        if input.scheduled_at.is_some() {
            article.scheduled_at = input.scheduled_at;
        }
        if let Some(status) = input.status {
            self.apply_status(&mut article, status).await?;
        }

        if input.changes_versioned_fields(&current) {
            self.repo
                .create_version(&current)
                .await
                .context("Failed to snapshot article version")?;
        }

        self.refresh_derived(&mut article);
        article.updated_at = Utc::now();
        let article = self
            .repo
            .update(&article)
            .await
            .context("Failed to update article")?;

        if let Some(names) = &input.tags {
            self.replace_tags(tenant_id, article.id, names).await?;
        }

        self.invalidate(tenant_id).await;
        Ok(article)
    }

    /// Move an article to `status`, enforcing the workflow rules
    async fn apply_status(&self, article: &mut Article, status: ArticleStatus) -> ServiceResult<()> {
        match status {
            ArticleStatus::Scheduled if article.scheduled_at.is_none() => {
                return Err(ServiceError::validation("Scheduled articles need a scheduled time"));
            }
            ArticleStatus::Published | ArticleStatus::Scheduled => {
                if let Some(client_id) = article.client_id {
                    self.clients.ensure_active(article.tenant_id, client_id).await?;
                }
            }
            _ => {}
        }
        if status == ArticleStatus::Published && article.published_at.is_none() {
            article.published_at = Some(Utc::now());
        }
        article.status = status;
        Ok(())
    }

    /// Versions of an article, newest first
    pub async fn list_versions(&self, tenant_id: i64, id: i64) -> ServiceResult<Vec<ArticleVersion>> {
        self.get(tenant_id, id).await?;
        Ok(self
            .repo
            .list_versions(id)
            .await
            .context("Failed to list article versions")?)
    }

    /// Restore a version. The current state is snapshotted first.
    pub async fn restore_version(&self, tenant_id: i64, id: i64, version_id: i64) -> ServiceResult<Article> {
        self.get(tenant_id, id).await?;
        let version = self
            .repo
            .get_version(id, version_id)
            .await
            .context("Failed to get article version")?
            .ok_or_else(|| ServiceError::not_found("Article version"))?;

        tracing::info!("Restoring article {} to version {}", id, version.version_number);
        self.update(
            tenant_id,
            id,
            UpdateArticleInput {
                title: Some(version.title),
                content: Some(version.content),
                meta_title: Some(version.meta_title.unwrap_or_default()),
                meta_description: Some(version.meta_description.unwrap_or_default()),
                ..Default::default()
            },
        )
        .await
    }

    /// Replace the tags of an article by name, creating missing tags
    pub async fn set_tags(&self, tenant_id: i64, id: i64, names: &[String]) -> ServiceResult<Vec<Tag>> {
        self.get(tenant_id, id).await?;
        let tags = self.replace_tags(tenant_id, id, names).await?;
        self.invalidate(tenant_id).await;
        Ok(tags)
    }

    async fn replace_tags(&self, tenant_id: i64, article_id: i64, names: &[String]) -> ServiceResult<Vec<Tag>> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let slug = generate_slug(name);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                continue;
            }
            let tag = self
                .tag_repo
                .find_or_create(tenant_id, &slug, name)
                .await
                .context("Failed to find or create tag")?;
            tags.push(tag);
        }

        let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        self.tag_repo
            .set_for_article(article_id, &ids)
            .await
            .context("Failed to set article tags")?;
        Ok(tags)
    }

    /// Replace related articles. Self links and ids of other tenants are rejected.
    pub async fn set_related(&self, tenant_id: i64, id: i64, related_ids: &[i64]) -> ServiceResult<()> {
        self.get(tenant_id, id).await?;
        let related_ids = dedup(related_ids);
        if related_ids.contains(&id) {
            return Err(ServiceError::validation("An article cannot be related to itself"));
        }
        for related_id in &related_ids {
            let exists = self
                .repo
                .get_by_id(tenant_id, *related_id)
                .await
                .context("Failed to check related article")?
                .is_some();
            if !exists {
                return Err(ServiceError::validation(format!(
                    "Related article {} does not exist",
                    related_id
                )));
            }
        }

        self.repo
            .set_related(id, &related_ids)
            .await
            .context("Failed to set related articles")?;
        self.invalidate(tenant_id).await;
        Ok(())
    }

    /// Link FAQs to an article; list order becomes display order
    pub async fn set_faqs(&self, tenant_id: i64, id: i64, faq_ids: &[i64]) -> ServiceResult<()> {
        self.get(tenant_id, id).await?;
        let faq_ids = dedup(faq_ids);
        for faq_id in &faq_ids {
            let exists = self
                .faq_repo
                .get_by_id(tenant_id, *faq_id)
                .await
                .context("Failed to check FAQ")?
                .is_some();
            if !exists {
                return Err(ServiceError::validation(format!("FAQ {} does not exist", faq_id)));
            }
        }

        self.repo
            .set_faqs(id, &faq_ids)
            .await
            .context("Failed to link FAQs")?;
        self.invalidate(tenant_id).await;
        Ok(())
    }

    /// Set the status of several articles at once
    ///
    /// Publishing fails as a whole when any of the articles belongs to a
    /// client that is not active.
    pub async fn bulk_update_status(
        &self,
        tenant_id: i64,
        ids: &[i64],
        status: ArticleStatus,
    ) -> ServiceResult<u64> {
        if status == ArticleStatus::Scheduled {
            return Err(ServiceError::validation(
                "Articles must be scheduled one at a time with a scheduled time",
            ));
        }
        let ids = dedup(ids);
        if status == ArticleStatus::Published {
            for id in &ids {
                let client_id = self
                    .repo
                    .get_by_id(tenant_id, *id)
                    .await
                    .context("Failed to get article")?
                    .and_then(|a| a.client_id);
                if let Some(client_id) = client_id {
                    self.clients.ensure_active(tenant_id, client_id).await?;
                }
            }
        }
        let changed = self
            .repo
            .bulk_update_status(tenant_id, &ids, status)
            .await
            .context("Failed to update article statuses")?;
        tracing::info!("Set {} article(s) on tenant {} to {}", changed, tenant_id, status);
        self.invalidate(tenant_id).await;
        Ok(changed)
    }

    /// Record a reader view of a published article
    pub async fn record_view(
        &self,
        tenant_id: i64,
        article_id: i64,
        visitor_id: Option<&str>,
        referrer: Option<&str>,
    ) -> ServiceResult<()> {
        let published = self
            .repo
            .get_by_id(tenant_id, article_id)
            .await
            .context("Failed to get article")?
            .is_some_and(|a| a.is_published());
        if !published {
            return Err(ServiceError::not_found("Article"));
        }

        let referrer = referrer.map(str::trim).filter(|r| !r.is_empty());
        self.repo
            .record_view(tenant_id, article_id, visitor_id, referrer)
            .await
            .context("Failed to record view")?;
        Ok(())
    }

    /// Delete one article and everything referencing it
    pub async fn delete(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        if self.bulk_delete(tenant_id, &[id]).await? == 0 {
            return Err(ServiceError::not_found("Article"));
        }
        Ok(())
    }

    /// Delete several articles and their dependent rows in one transaction.
    /// Ids of other tenants are ignored; returns the number deleted.
    pub async fn bulk_delete(&self, tenant_id: i64, ids: &[i64]) -> ServiceResult<u64> {
        let ids = dedup(ids);
        if ids.is_empty() {
            return Ok(0);
        }
        let deleted = self.repo.delete_cascade(tenant_id, &ids).await.map_err(|e| {
            tracing::error!("Cascade delete of {:?} on tenant {} failed: {:#}", ids, tenant_id, e);
            ServiceError::Internal(e.context("Failed to delete articles"))
        })?;
        tracing::info!("Deleted {} article(s) on tenant {}", deleted, tenant_id);
        self.invalidate(tenant_id).await;
        Ok(deleted)
    }

    /// SEO analysis of the stored article
    pub async fn seo_analysis(&self, tenant_id: i64, id: i64) -> ServiceResult<SeoAnalysis> {
        let article = self.get(tenant_id, id).await?;
        Ok(analyze_article_seo(&SeoInput::from(&article)))
    }

    /// The editor's publish action: create or update, then publish or schedule
    pub async fn publish_from_form(&self, tenant_id: i64, form: PublishForm) -> ServiceResult<PublishOutcome> {
        let now = Utc::now();
        let (status, scheduled_at) = match form.scheduled_at {
            Some(at) if at > now => (ArticleStatus::Scheduled, Some(at)),
            _ => (ArticleStatus::Published, None),
        };

        let article = match form.id {
            Some(id) => {
                let input = UpdateArticleInput {
                    title: Some(form.title),
                    content: Some(form.content),
                    slug: form.slug,
                    excerpt: form.excerpt,
                    meta_title: form.meta_title,
                    meta_description: form.meta_description,
                    focus_keyword: form.focus_keyword,
                    featured_image: form.featured_image,
                    featured_image_alt: form.featured_image_alt,
                    client_id: form.client_id,
                    category_id: form.category_id,
                    author_id: form.author_id,
                    status: Some(status),
                    scheduled_at,
                    tags: form.tags,
                };
                self.update(tenant_id, id, input).await?
            }
            None => {
                let input = CreateArticleInput {
                    title: form.title,
                    content: form.content,
                    slug: form.slug,
                    excerpt: form.excerpt,
                    meta_title: form.meta_title,
                    meta_description: form.meta_description,
                    focus_keyword: form.focus_keyword,
                    featured_image: form.featured_image,
                    featured_image_alt: form.featured_image_alt,
                    client_id: form.client_id,
                    category_id: form.category_id,
                    author_id: form.author_id,
                    status: Some(status),
                    scheduled_at,
                    tags: form.tags,
                };
                self.create(tenant_id, input).await?
            }
        };

        tracing::info!("Article {} is now {}", article.id, article.status);
        Ok(PublishOutcome {
            article_id: article.id,
            status: article.status,
        })
    }

    /// Normalise a requested slug (or the title) and ensure it is unused
    async fn unique_slug(
        &self,
        tenant_id: i64,
        requested: Option<&str>,
        title: &str,
        exclude_id: Option<i64>,
    ) -> ServiceResult<String> {
        let source = requested.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(title);
        let slug = generate_slug(source);
        if slug.is_empty() {
            return Err(ServiceError::validation("Slug cannot be empty"));
        }
        if self
            .repo
            .exists_by_slug(tenant_id, &slug, exclude_id)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(ServiceError::conflict(format!("Article slug '{}' already exists", slug)));
        }
        Ok(slug)
    }

    async fn check_references(
        &self,
        tenant_id: i64,
        category_id: Option<i64>,
        author_id: Option<i64>,
    ) -> ServiceResult<()> {
        if let Some(category_id) = category_id {
            if self
                .category_repo
                .get_by_id(tenant_id, category_id)
                .await
                .context("Failed to check category")?
                .is_none()
            {
                return Err(ServiceError::validation(format!("Category {} does not exist", category_id)));
            }
        }
        if let Some(author_id) = author_id {
            if self
                .user_repo
                .get_by_id(tenant_id, author_id)
                .await
                .context("Failed to check author")?
                .is_none()
            {
                return Err(ServiceError::validation(format!("Author {} does not exist", author_id)));
            }
        }
        Ok(())
    }

    fn refresh_derived(&self, article: &mut Article) {
        article.content_html = self.markdown_renderer.render(&article.content);
        article.seo_score = analyze_article_seo(&SeoInput::from(&*article)).score;
    }

    async fn invalidate(&self, tenant_id: i64) {
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
}

/// Drop repeated ids, keeping first occurrences in order
fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
