//! Client service
//!
//! Client CRUD, tier assignment and monthly article quota accounting.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::cache::{invalidate_tenant, MemoryCache};
use crate::db::repositories::{ClientRepository, TierRepository};
use crate::models::{
    Client, ClientFilter, ClientUsage, CreateClientInput, ListParams, PagedResult, SubscriptionTier,
    UpdateClientInput,
};
use crate::services::{is_valid_email, non_blank, ServiceError, ServiceResult};

pub struct ClientService {
    repo: Arc<dyn ClientRepository>,
    tier_repo: Arc<dyn TierRepository>,
    cache: Arc<MemoryCache>,
}

/// First instant of the calendar month containing `now`, in UTC
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|start| Utc.from_utc_datetime(&start))
        .unwrap_or(now)
}

impl ClientService {
    pub fn new(
        repo: Arc<dyn ClientRepository>,
        tier_repo: Arc<dyn TierRepository>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self {
            repo,
            tier_repo,
            cache,
        }
    }

    pub async fn create(&self, tenant_id: i64, input: CreateClientInput) -> ServiceResult<Client> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("Client name cannot be empty"));
        }
        let email = non_blank(input.email);
        validate_email(email.as_deref())?;

        let now = Utc::now();
        let tier = match input.tier_id {
            Some(tier_id) => Some(self.assignable_tier(tenant_id, tier_id).await?),
            None => None,
        };

        let client = Client {
            id: 0,
            tenant_id,
            name,
            email,
            company: non_blank(input.company),
            website: non_blank(input.website),
            status: input.status.unwrap_or_default(),
            tier_id: tier.as_ref().map(|t| t.id),
            subscription_started_at: tier.as_ref().map(|_| now),
            created_at: now,
            updated_at: now,
        };
        let client = self.repo.create(&client).await.context("Failed to create client")?;
        tracing::info!("Created client {} for tenant {}", client.id, tenant_id);
        self.invalidate(tenant_id).await;
        Ok(client)
    }

    pub async fn get(&self, tenant_id: i64, id: i64) -> ServiceResult<Client> {
        self.repo
            .get_by_id(tenant_id, id)
            .await
            .context("Failed to get client")?
            .ok_or_else(|| ServiceError::not_found("Client"))
    }

    pub async fn list(
        &self,
        tenant_id: i64,
        filter: &ClientFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Client>> {
        let clients = self
            .repo
            .list(tenant_id, filter, params)
            .await
            .context("Failed to list clients")?;
        let total = self
            .repo
            .count(tenant_id, filter)
            .await
            .context("Failed to count clients")?;
        Ok(PagedResult::new(clients, total, params))
    }

    pub async fn update(&self, tenant_id: i64, id: i64, input: UpdateClientInput) -> ServiceResult<Client> {
        let mut client = self.get(tenant_id, id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::validation("Client name cannot be empty"));
            }
            client.name = name;
        }
        if input.email.is_some() {
            client.email = non_blank(input.email);
            validate_email(client.email.as_deref())?;
        }
        if input.company.is_some() {
            client.company = non_blank(input.company);
        }
        if input.website.is_some() {
            client.website = non_blank(input.website);
        }
        if let Some(status) = input.status {
            client.status = status;
        }
        match input.tier_id {
            Some(Some(tier_id)) if client.tier_id != Some(tier_id) => {
                let tier = self.assignable_tier(tenant_id, tier_id).await?;
                client.tier_id = Some(tier.id);
                client.subscription_started_at = Some(Utc::now());
            }
            Some(None) => {
                client.tier_id = None;
                client.subscription_started_at = None;
            }
            _ => {}
        }

        let client = self.repo.update(&client).await.context("Failed to update client")?;
        self.invalidate(tenant_id).await;
        Ok(client)
    }

    /// Put a client on a tier, restarting its subscription period
    pub async fn assign_tier(&self, tenant_id: i64, id: i64, tier_id: i64) -> ServiceResult<Client> {
        let mut client = self.get(tenant_id, id).await?;
        let tier = self.assignable_tier(tenant_id, tier_id).await?;
        client.tier_id = Some(tier.id);
        client.subscription_started_at = Some(Utc::now());

        let client = self.repo.update(&client).await.context("Failed to assign tier")?;
        tracing::info!("Client {} moved to tier {}", client.id, tier.slug);
        self.invalidate(tenant_id).await;
        Ok(client)
    }

    pub async fn delete(&self, tenant_id: i64, id: i64) -> ServiceResult<()> {
        let deleted = self
            .repo
            .delete(tenant_id, id)
            .await
            .context("Failed to delete client")?;
        if !deleted {
            return Err(ServiceError::not_found("Client"));
        }
        self.invalidate(tenant_id).await;
        Ok(())
    }

    /// Articles created for the client this month against its tier quota
    pub async fn usage(&self, tenant_id: i64, id: i64) -> ServiceResult<ClientUsage> {
        let client = self.get(tenant_id, id).await?;
        self.usage_for(&client).await
    }

    async fn usage_for(&self, client: &Client) -> ServiceResult<ClientUsage> {
        let period_start = month_start(Utc::now());
        let tier = match client.tier_id {
            Some(tier_id) => self
                .tier_repo
                .get_by_id(client.tenant_id, tier_id)
                .await
                .context("Failed to get client tier")?,
            None => None,
        };
        let used = self
            .repo
            .count_articles_since(client.id, period_start)
            .await
            .context("Failed to count client articles")?;

        Ok(ClientUsage::new(
            client.id,
            tier.as_ref().map(|t| t.id),
            tier.as_ref().map(|t| t.name.clone()),
            tier.and_then(|t| t.monthly_article_quota),
            used,
            period_start,
        ))
    }

    /// Reject new articles for clients that are not active
    pub async fn ensure_active(&self, tenant_id: i64, client_id: i64) -> ServiceResult<Client> {
        let client = self.get(tenant_id, client_id).await?;
        if !client.is_active() {
            return Err(ServiceError::validation(format!(
                "Client '{}' is {} and cannot receive articles",
                client.name, client.status
            )));
        }
        Ok(client)
    }

    /// Reject a new article when the client is inactive or out of quota
    pub async fn ensure_can_create_article(&self, tenant_id: i64, client_id: i64) -> ServiceResult<()> {
        let client = self.ensure_active(tenant_id, client_id).await?;
        let usage = self.usage_for(&client).await?;
        if !usage.has_capacity() {
            tracing::warn!(
                "Client {} exhausted its quota of {:?} articles",
                client.id,
                usage.monthly_quota
            );
            return Err(ServiceError::validation(format!(
                "Client '{}' has used its monthly quota of {} articles",
                client.name,
                usage.monthly_quota.unwrap_or_default()
            )));
        }
        Ok(())
    }

    async fn assignable_tier(&self, tenant_id: i64, tier_id: i64) -> ServiceResult<SubscriptionTier> {
        let tier = self
            .tier_repo
            .get_by_id(tenant_id, tier_id)
            .await
            .context("Failed to get tier")?
            .ok_or_else(|| ServiceError::validation(format!("Tier {} does not exist", tier_id)))?;
        if !tier.is_active {
            return Err(ServiceError::validation(format!("Tier '{}' is not active", tier.name)));
        }
        Ok(tier)
    }

    async fn invalidate(&self, tenant_id: i64) {
        if let Err(e) = invalidate_tenant(self.cache.as_ref(), tenant_id).await {
            tracing::warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, e);
        }
    }
}

fn validate_email(email: Option<&str>) -> ServiceResult<()> {
    match email {
        Some(email) if !is_valid_email(email) => {
            Err(ServiceError::validation(format!("Invalid email address: {}", email)))
        }
        _ => Ok(()),
    }
}
