//! Newsletter subscriber service
//!
//! Signups are idempotent: subscribing an address twice returns the same
//! row, and an unsubscribed address is reactivated in place.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::SubscriberRepository;
use crate::models::{ListParams, PagedResult, SubscribeInput, Subscriber, SubscriberStatus};
use crate::services::{is_valid_email, non_blank, ServiceError, ServiceResult};

pub struct SubscriberService {
    repo: Arc<dyn SubscriberRepository>,
    cache: Arc<MemoryCache>,
}

fn normalize_email(email: &str) -> ServiceResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ServiceError::validation("Email cannot be empty"));
    }
    if !is_valid_email(&email) {
        return Err(ServiceError::validation(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}

impl SubscriberService {
    pub fn new(repo: Arc<dyn SubscriberRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn subscribe(&self, tenant_id: i64, input: SubscribeInput) -> ServiceResult<Subscriber> {
        let email = normalize_email(&input.email)?;
        let name = non_blank(input.name);
        let source = non_blank(input.source);
        let now = Utc::now();

        let existing = self
            .repo
            .get_by_email(tenant_id, &email)
            .await
            .context("Failed to look up subscriber")?;

        let subscriber = match existing {
            Some(subscriber) if subscriber.status == SubscriberStatus::Subscribed => {
                return Ok(subscriber);
            }
            Some(subscriber) => {
                self.repo
                    .resubscribe(subscriber.id, name.as_deref(), source.as_deref(), now)
                    .await
                    .context("Failed to resubscribe")?;
                tracing::info!("Resubscribed {} on tenant {}", email, tenant_id);
                self.repo
                    .get_by_email(tenant_id, &email)
                    .await
                    .context("Failed to reload subscriber")?
                    .ok_or_else(|| ServiceError::not_found("Subscriber"))?
            }
            None => {
                let subscriber = Subscriber {
                    id: 0,
                    tenant_id,
                    email,
                    name,
                    status: SubscriberStatus::Subscribed,
                    source,
                    subscribed_at: now,
                    unsubscribed_at: None,
                };
                self.repo
                    .create(&subscriber)
                    .await
                    .context("Failed to create subscriber")?
            }
        };

        self.invalidate(tenant_id).await;
        Ok(subscriber)
    }

    /// Unsubscribe an address. Repeating the call is harmless.
    pub async fn unsubscribe(&self, tenant_id: i64, email: &str) -> ServiceResult<()> {
        let email = normalize_email(email)?;
        let changed = self
            .repo
            .unsubscribe(tenant_id, &email, Utc::now())
            .await
            .context("Failed to unsubscribe")?;
        if changed {
            self.invalidate(tenant_id).await;
            return Ok(());
        }

        let known = self
            .repo
            .get_by_email(tenant_id, &email)
            .await
            .context("Failed to look up subscriber")?
            .is_some();
        if known {
            Ok(())
        } else {
            Err(ServiceError::not_found("Subscriber"))
        }
    }

    pub async fn list(
        &self,
        tenant_id: i64,
        status: Option<SubscriberStatus>,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Subscriber>> {
        let (items, total) = self
            .repo
            .list(tenant_id, status, params)
            .await
            .context("Failed to list subscribers")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn count(&self, tenant_id: i64, status: Option<SubscriberStatus>) -> ServiceResult<i64> {
        Ok(self
            .repo
            .count(tenant_id, status)
            .await
            .context("Failed to count subscribers")?)
    }

    pub async fn delete(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        if !self
            .repo
            .delete(tenant_id, id)
            .await
            .context("Failed to delete subscriber")?
        {
            return Err(ServiceError::not_found("Subscriber"));
        }
        self.invalidate(tenant_id).await;
        Ok(())
    }

    async fn invalidate(&self, tenant_id: i64) {
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxSubscriberRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SubscriberService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SubscriberService::new(
            SqlxSubscriberRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        )
    }

    fn signup(email: &str) -> SubscribeInput {
        SubscribeInput {
            email: email.to_string(),
            name: None,
            source: Some("footer".to_string()),
        }
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let service = setup().await;
        let first = service.subscribe(1, signup("Reader@Example.com ")).await.unwrap();
        assert_eq!(first.email, "reader@example.com");

        let second = service.subscribe(1, signup("reader@example.com")).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(service.count(1, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_after_unsubscribe() {
        let service = setup().await;
        let first = service.subscribe(1, signup("a@example.com")).await.unwrap();
        service.unsubscribe(1, "a@example.com").await.unwrap();
        service.unsubscribe(1, "A@example.com").await.unwrap();
        assert_eq!(service.count(1, Some(SubscriberStatus::Subscribed)).await.unwrap(), 0);

        let again = service.subscribe(1, signup("a@example.com")).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, SubscriberStatus::Subscribed);
        assert!(again.unsubscribed_at.is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let service = setup().await;
        for email in ["", "nope", "a@b"] {
            assert!(matches!(
                service.subscribe(1, signup(email)).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_email() {
        let service = setup().await;
        assert!(matches!(
            service.unsubscribe(1, "ghost@example.com").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let service = setup().await;
        let a = service.subscribe(1, signup("a@example.com")).await.unwrap();
        service.subscribe(1, signup("b@example.com")).await.unwrap();
        service.unsubscribe(1, "b@example.com").await.unwrap();

        let subscribed = service
            .list(1, Some(SubscriberStatus::Subscribed), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(subscribed.total, 1);
        assert_eq!(subscribed.items[0].email, "a@example.com");

        service.delete(1, a.id).await.unwrap();
        assert!(matches!(service.delete(1, a.id).await, Err(ServiceError::NotFound(_))));
    }
}
