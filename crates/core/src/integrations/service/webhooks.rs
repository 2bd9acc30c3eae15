//! Webhook operations delegated to the integration's provider.
//!
//! Providers own the create ordering (verify, delete exact URL matches,
//! create); the service supplies the provider and the public base URL.

use std::sync::Arc;

use integrahub_domain::constants::{ENV_URL_BASE_SWAGGER, ENV_WEBHOOK_BASE_URL};
use integrahub_domain::{HubError, IntegrationId, RemoteWebhook, Result, WebhookInfo};
use serde_json::Value;
use tracing::{info, instrument};

use super::IntegrationService;
use crate::integrations::provider::IntegrationProvider;

impl IntegrationService {
    fn require_base_url(&self) -> Result<&str> {
        self.webhook_base_url.as_deref().ok_or_else(|| {
            HubError::Config(format!(
                "webhook base URL is not configured (set {ENV_WEBHOOK_BASE_URL} or {ENV_URL_BASE_SWAGGER})"
            ))
        })
    }

    async fn provider_for(&self, id: IntegrationId) -> Result<Arc<dyn IntegrationProvider>> {
        let integration = self.resolver.integration(id).await?;
        self.require_provider(&integration)
    }

    #[instrument(skip(self), fields(operation = "get_webhook_url"))]
    pub async fn get_webhook_url(&self, id: IntegrationId) -> Result<WebhookInfo> {
        let provider = self.provider_for(id).await?;
        let base_url = self.require_base_url()?;
        provider.get_webhook_url(base_url, id).await
    }

    #[instrument(skip(self), fields(operation = "list_webhooks"))]
    pub async fn list_webhooks(&self, id: IntegrationId) -> Result<Vec<RemoteWebhook>> {
        self.provider_for(id).await?.list_webhooks(id).await
    }

    #[instrument(skip(self), fields(operation = "create_webhook"))]
    pub async fn create_webhook(&self, id: IntegrationId) -> Result<Value> {
        let provider = self.provider_for(id).await?;
        let base_url = self.require_base_url()?;
        let created = provider.create_webhook(id, base_url).await?;
        info!(integration_id = id, provider = provider.name(), "webhooks created");
        Ok(created)
    }

    #[instrument(skip(self), fields(operation = "delete_webhook"))]
    pub async fn delete_webhook(&self, id: IntegrationId, webhook_id: &str) -> Result<()> {
        if webhook_id.trim().is_empty() {
            return Err(HubError::Validation("webhook_id is required".into()));
        }
        self.provider_for(id).await?.delete_webhook(id, webhook_id).await
    }

    /// Remote webhooks pointing at this deployment's base URL.
    #[instrument(skip(self), fields(operation = "verify_webhooks"))]
    pub async fn verify_webhooks(&self, id: IntegrationId) -> Result<Vec<RemoteWebhook>> {
        let provider = self.provider_for(id).await?;
        let base_url = self.require_base_url()?;
        provider.verify_webhooks_by_url(id, base_url).await
    }
}
