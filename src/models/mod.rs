//! Data models
//!
//! Records stored per tenant and the request/response types built from them:
//! - Tenancy: `Tenant`
//! - Commerce: `SubscriptionTier`, `Client`, `ClientUsage`
//! - Audience: `User`, `Subscriber`, `UserProfile`
//! - Content: `Article`, `ArticleVersion`, `Category`, `Tag`, `Faq`
//! - Engagement and analytics: `Comment`, `LikeResult`, `DashboardStats`

mod analytics;
mod article;
mod category;
mod client;
mod engagement;
mod faq;
mod subscriber;
mod tenant;
mod tier;
mod user;

pub use analytics::{DailyViews, DashboardStats, StatusCount, TierBreakdown, TopArticle, WindowCount};
pub use article::{
    Article, ArticleDetail, ArticleExportRow, ArticleFilter, ArticleStatus, ArticleSummary,
    ArticleVersion, CreateArticleInput, ListParams, PagedResult, Tag, UpdateArticleInput,
};
pub use category::{Category, CreateCategoryInput};
pub use client::{Client, ClientFilter, ClientStatus, ClientUsage, CreateClientInput, UpdateClientInput};
pub use engagement::{
    Comment, CommentStatus, CommentThread, CreateCommentInput, FavoriteResult, LikeResult,
};
pub use faq::{
    CreateFaqInput, Faq, FaqFeedbackResult, FeedbackIdentity, FeedbackOutcome, UpdateFaqInput,
};
pub use subscriber::{SubscribeInput, Subscriber, SubscriberStatus};
pub use tenant::{CreateTenantInput, Tenant};
pub use tier::{CreateTierInput, SubscriptionTier, UpdateTierInput};
pub use user::{CreateUserInput, UpdateProfileInput, User, UserProfile, UserRole, UserSummary};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes "absent" from an explicit `null`.
///
/// Absent fields become `None` through `#[serde(default)]`; `null` becomes
/// `Some(None)` and clears the stored value.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
