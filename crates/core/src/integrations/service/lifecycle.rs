use chrono::{DateTime, Utc};
use integrahub_domain::{HubError, Integration, IntegrationId, Result, UpdateIntegrationRequest};
use tracing::{debug, info, instrument};

use super::IntegrationService;

impl IntegrationService {
    /// Idempotent: no store or cache write when already active.
    pub async fn activate_integration(&self, id: IntegrationId) -> Result<Integration> {
        self.set_active(id, true).await
    }

    /// Idempotent: no store or cache write when already inactive.
    pub async fn deactivate_integration(&self, id: IntegrationId) -> Result<Integration> {
        self.set_active(id, false).await
    }

    #[instrument(skip(self), fields(operation = "set_active"))]
    async fn set_active(&self, id: IntegrationId, active: bool) -> Result<Integration> {
        let current = self.integrations.get_integration_by_id(id).await?;
        if current.is_active == active {
            debug!(integration_id = id, active, "already in target state");
            return Ok(current);
        }

        self.update_integration(
            id,
            UpdateIntegrationRequest { is_active: Some(active), updated_by: 0, ..Default::default() },
        )
        .await
    }

    /// Make `id` the only default of its `(type, tenant)` pair.
    #[instrument(skip(self), fields(operation = "set_integration_as_default"))]
    pub async fn set_integration_as_default(&self, id: IntegrationId) -> Result<Integration> {
        self.cache.invalidate_integration(id).await;
        let cleared = self
            .integrations
            .set_integration_as_default(id)
            .await
            .map_err(|e| e.with_context("set_integration_as_default"))?;
        self.invalidate_all(&cleared).await;

        let integration = self.integrations.get_integration_by_id(id).await?;
        self.resolver.remember(&integration).await;
        info!(integration_id = id, cleared = cleared.len(), "integration set as default");
        Ok(integration)
    }

    /// Delete unless the provider of the type only allows deactivation.
    #[instrument(skip(self), fields(operation = "delete_integration"))]
    pub async fn delete_integration(&self, id: IntegrationId) -> Result<()> {
        let integration = self
            .integrations
            .get_integration_by_id(id)
            .await
            .map_err(|e| e.with_context("delete_integration"))?;

        if let Some(provider) = self.registry.get(integration.integration_type_id) {
            if !provider.allows_deletion() {
                return Err(HubError::DeletionForbidden(format!(
                    "{} integrations can only be deactivated",
                    provider.name()
                )));
            }
        }

        self.integrations.delete_integration(id).await?;
        self.cache.invalidate_integration(id).await;
        info!(integration_id = id, "integration deleted");
        Ok(())
    }

    /// Bump the last-sync timestamp.
    pub async fn update_last_sync(&self, id: IntegrationId, at: DateTime<Utc>) -> Result<()> {
        self.cache.invalidate_integration(id).await;
        self.integrations.update_last_sync(id, at).await?;
        let integration = self.integrations.get_integration_by_id(id).await?;
        self.resolver.remember(&integration).await;
        Ok(())
    }
}
