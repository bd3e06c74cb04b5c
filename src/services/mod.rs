//! Services layer - Business logic
//!
//! Services validate input, call repositories, keep caches coherent and shape
//! results for the HTTP layer. Every service reports failures through
//! [`ServiceError`].

pub mod article;
pub mod category;
pub mod client;
pub mod dashboard;
pub mod engagement;
pub mod export;
pub mod faq;
pub mod markdown;
pub mod scheduler;
pub mod seo;
pub mod slug;
pub mod subscriber;
pub mod tenant;
pub mod tier;
pub mod user;

pub use article::{ArticleService, PublishForm, PublishOutcome};
pub use category::CategoryService;
pub use client::ClientService;
pub use dashboard::{calculate_trend, DashboardService};
pub use engagement::EngagementService;
pub use export::{csv_escape, render_articles_csv, ExportService, CSV_BOM};
pub use faq::FaqService;
pub use markdown::MarkdownRenderer;
pub use scheduler::{publish_due_articles, spawn_scheduler};
pub use seo::{analyze_article_seo, score_label, SeoAnalysis, SeoCheck, SeoInput};
pub use slug::generate_slug;
pub use subscriber::SubscriberService;
pub use tenant::TenantService;
pub use tier::TierService;
pub use user::UserService;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Error returned by service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Requested record does not exist in the tenant
    #[error("{0} not found")]
    NotFound(String),

    /// Input rejected before touching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness conflict (slug, username, email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage or other unexpected failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trim an optional string, mapping blank values to `None`
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Basic shape check for an email address
pub(crate) fn is_valid_email(email: &str) -> bool {
    email.len() <= 255 && EMAIL_RE.is_match(email)
}
