//! FAQ service
//!
//! FAQs are managed per tenant and can be attached to articles. Readers vote
//! on whether an answer helped; each user or session holds one vote per FAQ.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::FaqRepository;
use crate::models::{CreateFaqInput, Faq, FaqFeedbackResult, FeedbackIdentity, UpdateFaqInput};
use crate::services::{non_blank, ServiceError, ServiceResult};

pub struct FaqService {
    repo: Arc<dyn FaqRepository>,
    cache: Arc<MemoryCache>,
}

impl FaqService {
    pub fn new(repo: Arc<dyn FaqRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, tenant_id: i64, input: CreateFaqInput) -> ServiceResult<Faq> {
        let question = required(&input.question, "Question")?;
        let answer = required(&input.answer, "Answer")?;

        let now = Utc::now();
        let faq = Faq {
            id: 0,
            tenant_id,
            question,
            answer,
            category: non_blank(input.category),
            sort_order: input.sort_order.unwrap_or(0),
            is_published: input.is_published.unwrap_or(true),
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        let faq = self.repo.create(&faq).await.context("Failed to create FAQ")?;
        tracing::info!("Created FAQ {} on tenant {}", faq.id, tenant_id);
        self.invalidate(tenant_id).await;
        Ok(faq)
    }

    pub async fn get(&self, tenant_id: i64, id: i64) -> ServiceResult<Faq> {
        self.repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get FAQ")?
            .ok_or_else(|| ServiceError::not_found("FAQ"))
    }

    /// All FAQs of a tenant, drafts included
    pub async fn list(&self, tenant_id: i64) -> ServiceResult<Vec<Faq>> {
        Ok(self.repo.list(tenant_id, false).await.context("Failed to list FAQs")?)
    }

    pub async fn list_published(&self, tenant_id: i64) -> ServiceResult<Vec<Faq>> {
        Ok(self.repo.list(tenant_id, true).await.context("Failed to list FAQs")?)
    }

    pub async fn update(&self, tenant_id: i64, id: i64, input: UpdateFaqInput) -> ServiceResult<Faq> {
        let mut faq = self.get(tenant_id, id).await?;
        if let Some(question) = &input.question {
            faq.question = required(question, "Question")?;
        }
        if let Some(answer) = &input.answer {
            faq.answer = required(answer, "Answer")?;
        }
        if input.category.is_some() {
            faq.category = non_blank(input.category);
        }
        if let Some(sort_order) = input.sort_order {
            faq.sort_order = sort_order;
        }
        if let Some(is_published) = input.is_published {
            faq.is_published = is_published;
        }
        faq.updated_at = Utc::now();

        let faq = self.repo.update(&faq).await.context("Failed to update FAQ")?;
        self.invalidate(tenant_id).await;
        Ok(faq)
    }

    pub async fn delete(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        if !self.repo.delete(tenant_id, id).await.context("Failed to delete FAQ")? {
            return Err(ServiceError::not_found("FAQ"));
        }
        self.invalidate(tenant_id).await;
        Ok(())
    }

    /// Record a helpful/unhelpful vote on a published FAQ
    ///
    /// The user id wins over the session id when both are present. A repeat
    /// of the same vote changes nothing; the opposite vote moves the counters.
    pub async fn submit_feedback(
        &self,
        tenant_id: i64,
        faq_id: i64,
        user_id: Option<i64>,
        session_id: Option<&str>,
        helpful: bool,
    ) -> ServiceResult<FaqFeedbackResult> {
        let identity = FeedbackIdentity::from_parts(user_id, session_id)
            .ok_or_else(|| ServiceError::validation("Feedback requires a user or session id"))?;

        let faq = self.get(tenant_id, faq_id).await?;
        if !faq.is_published {
            return Err(ServiceError::not_found("FAQ"));
        }

        let result = self
            .repo
            .submit_feedback(faq.id, &identity, helpful)
            .await
            .context("Failed to record FAQ feedback")?;
        tracing::debug!("FAQ {} feedback from {:?}: {:?}", faq_id, identity, result.outcome);
        self.invalidate(tenant_id).await;
        Ok(result)
    }

    async fn invalidate(&self, tenant_id: i64) {
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
}

fn required(value: &str, field: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxFaqRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::FeedbackOutcome;

    async fn setup() -> FaqService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        FaqService::new(SqlxFaqRepository::boxed(pool), create_cache(&CacheConfig::default()))
    }

    fn input(question: &str) -> CreateFaqInput {
        CreateFaqInput {
            question: question.to_string(),
            answer: "Because.".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_question_and_answer() {
        let service = setup().await;
        assert!(matches!(
            service.create(1, input(" ")).await,
            Err(ServiceError::Validation(_))
        ));
        let mut no_answer = input("Why?");
        no_answer.answer = String::new();
        assert!(matches!(
            service.create(1, no_answer).await,
            Err(ServiceError::Validation(_))
        ));

        let faq = service.create(1, input("  Why?  ")).await.unwrap();
        assert_eq!(faq.question, "Why?");
        assert!(faq.is_published);
    }

    #[tokio::test]
    async fn test_list_published_hides_drafts() {
        let service = setup().await;
        let mut first = input("First");
        first.sort_order = Some(2);
        service.create(1, first).await.unwrap();
        let mut second = input("Second");
        second.sort_order = Some(1);
        service.create(1, second).await.unwrap();
        let mut draft = input("Draft");
        draft.is_published = Some(false);
        service.create(1, draft).await.unwrap();

        let all = service.list(1).await.unwrap();
        assert_eq!(all.len(), 3);
        let published = service.list_published(1).await.unwrap();
        let questions: Vec<&str> = published.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(questions, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = setup().await;
        let faq = service.create(1, input("Q")).await.unwrap();
        let updated = service
            .update(
                1,
                faq.id,
                UpdateFaqInput {
                    answer: Some("New answer".to_string()),
                    is_published: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.answer, "New answer");
        assert!(!updated.is_published);

        service.delete(1, faq.id).await.unwrap();
        assert!(matches!(service.delete(1, faq.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_feedback_flow() {
        let service = setup().await;
        let faq = service.create(1, input("Q")).await.unwrap();

        let first = service
            .submit_feedback(1, faq.id, None, Some("session-a"), true)
            .await
            .unwrap();
        assert_eq!(first.outcome, FeedbackOutcome::Recorded);
        assert_eq!((first.upvotes, first.downvotes), (1, 0));

        let repeat = service
            .submit_feedback(1, faq.id, None, Some("session-a"), true)
            .await
            .unwrap();
        assert_eq!(repeat.outcome, FeedbackOutcome::Unchanged);
        assert_eq!((repeat.upvotes, repeat.downvotes), (1, 0));

        let flipped = service
            .submit_feedback(1, faq.id, None, Some("session-a"), false)
            .await
            .unwrap();
        assert_eq!(flipped.outcome, FeedbackOutcome::Changed);
        assert_eq!((flipped.upvotes, flipped.downvotes), (0, 1));
    }

    #[tokio::test]
    async fn test_feedback_requires_identity_and_published_faq() {
        let service = setup().await;
        let faq = service.create(1, input("Q")).await.unwrap();
        assert!(matches!(
            service.submit_feedback(1, faq.id, None, Some("  "), true).await,
            Err(ServiceError::Validation(_))
        ));

        let mut draft = input("Hidden");
        draft.is_published = Some(false);
        let draft = service.create(1, draft).await.unwrap();
        assert!(matches!(
            service.submit_feedback(1, draft.id, Some(1), None, true).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.submit_feedback(2, faq.id, Some(1), None, true).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
