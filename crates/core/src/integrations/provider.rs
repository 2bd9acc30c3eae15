//! Provider contract
//!
//! One implementation per integration type, registered against the type's
//! numeric id. Only `test_connection` is mandatory; every other capability
//! defaults to `NotSupported` so callers can branch on the sentinel.

use async_trait::async_trait;
use integrahub_domain::{
    CredentialMap, HubError, IntegrationId, JsonMap, ProviderTenancy, RemoteWebhook, Result,
    SyncParams, WebhookInfo,
};
use serde_json::Value;

#[async_trait]
pub trait IntegrationProvider: Send + Sync {
    /// Human-readable provider name for logs.
    fn name(&self) -> &str;

    /// Where integrations of this type may live.
    fn tenancy(&self) -> ProviderTenancy {
        ProviderTenancy::Any
    }

    /// Whether integrations of this type can be deleted.
    fn allows_deletion(&self) -> bool {
        true
    }

    /// Verify that `config` and plaintext `credentials` reach the platform.
    async fn test_connection(&self, config: &JsonMap, credentials: &CredentialMap) -> Result<()>;

    async fn sync_orders_by_integration_id(&self, _integration_id: IntegrationId) -> Result<()> {
        Err(HubError::not_supported("sync_orders_by_integration_id"))
    }

    async fn sync_orders_by_integration_id_with_params(
        &self,
        _integration_id: IntegrationId,
        _params: &SyncParams,
    ) -> Result<()> {
        Err(HubError::not_supported("sync_orders_by_integration_id_with_params"))
    }

    async fn get_webhook_url(
        &self,
        _base_url: &str,
        _integration_id: IntegrationId,
    ) -> Result<WebhookInfo> {
        Err(HubError::not_supported("get_webhook_url"))
    }

    async fn list_webhooks(&self, _integration_id: IntegrationId) -> Result<Vec<RemoteWebhook>> {
        Err(HubError::not_supported("list_webhooks"))
    }

    /// Register the callback with the remote platform; returns the
    /// platform's description of what was created.
    async fn create_webhook(&self, _integration_id: IntegrationId, _base_url: &str) -> Result<Value> {
        Err(HubError::not_supported("create_webhook"))
    }

    async fn delete_webhook(&self, _integration_id: IntegrationId, _webhook_id: &str) -> Result<()> {
        Err(HubError::not_supported("delete_webhook"))
    }

    /// Webhooks on the remote platform whose URL points at `base_url`.
    async fn verify_webhooks_by_url(
        &self,
        _integration_id: IntegrationId,
        _base_url: &str,
    ) -> Result<Vec<RemoteWebhook>> {
        Err(HubError::not_supported("verify_webhooks_by_url"))
    }
}
