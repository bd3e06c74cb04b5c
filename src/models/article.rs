//! Article model
//!
//! This module provides:
//! - `Article` entity with its SEO metadata and engagement counters
//! - `ArticleStatus` enum for the editorial workflow
//! - Input, filter and view types used by the article service
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Faq, UserSummary};

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Owning tenant
    pub tenant_id: i64,
    /// Client the article was written for
    pub client_id: Option<i64>,
    /// Category ID
    pub category_id: Option<i64>,
    /// Author user ID
    pub author_id: Option<i64>,
    /// URL-friendly slug (unique per tenant)
    pub slug: String,
    /// Article title
    pub title: String,
    /// Short summary for listings
    pub excerpt: Option<String>,
    /// Markdown content
    pub content: String,
    /// Rendered HTML content
    pub content_html: String,
    /// Title used in search results, falls back to `title`
    pub meta_title: Option<String>,
    /// Description used in search results
    pub meta_description: Option<String>,
    /// Keyword the article is optimised for
    pub focus_keyword: Option<String>,
    /// Featured image URL
    pub featured_image: Option<String>,
    /// Alt text of the featured image
    pub featured_image_alt: Option<String>,
    /// Editorial status
    pub status: ArticleStatus,
    /// Last computed SEO score (0..=100)
    pub seo_score: i64,
    /// View count
    pub view_count: i64,
    /// Like count
    pub like_count: i64,
    /// Approved comment count
    pub comment_count: i64,
    /// When a scheduled article goes live
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Publication timestamp, set once
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Whether readers can see the article
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }

    /// Compact view used for related-article lists
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            slug: self.slug.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            featured_image: self.featured_image.clone(),
            published_at: self.published_at,
        }
    }
}

/// Article publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Draft - not visible to readers
    #[default]
    Draft,
    /// Scheduled - published automatically at `scheduled_at`
    Scheduled,
    /// Published - visible to readers
    Published,
    /// Archived - hidden but not deleted
    Archived,
}

impl ArticleStatus {
    /// All statuses, in workflow order
    pub const ALL: [ArticleStatus; 4] = [
        ArticleStatus::Draft,
        ArticleStatus::Scheduled,
        ArticleStatus::Published,
        ArticleStatus::Archived,
    ];

    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Scheduled => "scheduled",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ArticleStatus::Draft),
            "scheduled" => Ok(ArticleStatus::Scheduled),
            "published" => Ok(ArticleStatus::Published),
            "archived" => Ok(ArticleStatus::Archived),
            _ => Err(format!("Invalid article status: {}", s)),
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub title: String,
    pub content: String,
    /// Generated from the title when omitted or blank
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub focus_keyword: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub featured_image_alt: Option<String>,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub author_id: Option<i64>,
    /// Defaults to draft
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Tag names, created when missing
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Input for updating an existing article. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub focus_keyword: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub featured_image_alt: Option<String>,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl UpdateArticleInput {
    /// Create a new empty UpdateArticleInput
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the update touches fields captured by a version snapshot
    pub fn changes_versioned_fields(&self, current: &Article) -> bool {
        fn differs(new: &Option<String>, old: &str) -> bool {
            new.as_deref().is_some_and(|v| v != old)
        }
        fn differs_opt(new: &Option<String>, old: &Option<String>) -> bool {
            new.is_some() && new != old
        }

        differs(&self.title, &current.title)
            || differs(&self.content, &current.content)
            || differs_opt(&self.meta_title, &current.meta_title)
            || differs_opt(&self.meta_description, &current.meta_description)
    }
}

/// Filter for article listings and exports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub client_id: Option<i64>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Case-insensitive match on the title
    pub search: Option<String>,
}

/// Snapshot of an article taken before an edit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleVersion {
    pub id: i64,
    pub article_id: i64,
    /// 1-based, increasing per article
    pub version_number: i64,
    pub title: String,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub tenant_id: i64,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Compact article reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Reader-facing article with its related records resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub category: Option<Category>,
    pub author: Option<UserSummary>,
    pub tags: Vec<Tag>,
    /// Published FAQs linked to the article, in link order
    pub faqs: Vec<Faq>,
    /// Published related articles
    pub related: Vec<ArticleSummary>,
}

/// One article row of the CSV export, with names already joined in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleExportRow {
    pub title: String,
    pub status: ArticleStatus,
    pub client_name: Option<String>,
    pub category_name: Option<String>,
    pub author_name: Option<String>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        (self.total.max(0) as u32).div_ceil(self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Transform the items, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> Article {
        let now = Utc::now();
        Article {
            id: 1,
            tenant_id: 1,
            client_id: None,
            category_id: None,
            author_id: None,
            slug: "hello".to_string(),
            title: "Hello".to_string(),
            excerpt: None,
            content: "Body".to_string(),
            content_html: "<p>Body</p>".to_string(),
            meta_title: None,
            meta_description: Some("desc".to_string()),
            focus_keyword: None,
            featured_image: None,
            featured_image_alt: None,
            status: ArticleStatus::Draft,
            seo_score: 0,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            scheduled_at: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in ArticleStatus::ALL {
            assert_eq!(status.as_str().parse::<ArticleStatus>(), Ok(status));
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!("deleted".parse::<ArticleStatus>().is_err());
    }

    #[test]
    fn test_list_params_clamp() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);

        let params = ListParams::new(3, 0);
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn test_paged_result_total_pages() {
        let params = ListParams::new(1, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![], 25, &params);
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &params);
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
    }

    #[test]
    fn test_changes_versioned_fields() {
        let article = sample_article();

        let same = UpdateArticleInput {
            title: Some("Hello".to_string()),
            meta_description: Some("desc".to_string()),
            ..Default::default()
        };
        assert!(!same.changes_versioned_fields(&article));

        let unrelated = UpdateArticleInput {
            excerpt: Some("new excerpt".to_string()),
            ..Default::default()
        };
        assert!(!unrelated.changes_versioned_fields(&article));

        let retitled = UpdateArticleInput {
            title: Some("Hello again".to_string()),
            ..Default::default()
        };
        assert!(retitled.changes_versioned_fields(&article));

        let new_meta = UpdateArticleInput {
            meta_title: Some("Meta".to_string()),
            ..Default::default()
        };
        assert!(new_meta.changes_versioned_fields(&article));
    }
}
