//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles one aggregate and is scoped by tenant where the
//! underlying table is.

pub mod analytics;
pub mod article;
pub mod category;
pub mod client;
pub mod comment;
pub mod engagement;
pub mod faq;
pub mod subscriber;
pub mod tag;
pub mod tenant;
pub mod tier;
pub mod user;

pub use analytics::{AnalyticsRepository, SqlxAnalyticsRepository, TrendMetric};
pub use article::{ArticleRepository, SqlxArticleRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use client::{ClientRepository, SqlxClientRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use engagement::{EngagementRepository, SqlxEngagementRepository};
pub use faq::{FaqRepository, SqlxFaqRepository};
pub use subscriber::{SqlxSubscriberRepository, SubscriberRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use tenant::{SqlxTenantRepository, TenantRepository};
pub use tier::{SqlxTierRepository, TierRepository};
pub use user::{ProfileCounts, SqlxUserRepository, UserRepository};
