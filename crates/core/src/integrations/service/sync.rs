use chrono::Utc;
use integrahub_domain::{BusinessId, IntegrationId, Result, SyncParams, SyncReport};
use tracing::{debug, info, instrument, warn};

use super::IntegrationService;

impl IntegrationService {
    #[instrument(skip(self), fields(operation = "sync_orders"))]
    pub async fn sync_orders(&self, id: IntegrationId) -> Result<()> {
        let integration = self.resolver.integration(id).await?;
        let provider = self.require_provider(&integration)?;
        provider.sync_orders_by_integration_id(id).await?;
        self.record_sync(id).await;
        Ok(())
    }

    /// Sync with parameters; providers that only support the plain variant
    /// are called without them.
    #[instrument(skip(self, params), fields(operation = "sync_orders_with_params"))]
    pub async fn sync_orders_with_params(&self, id: IntegrationId, params: &SyncParams) -> Result<()> {
        let integration = self.resolver.integration(id).await?;
        let provider = self.require_provider(&integration)?;

        match provider.sync_orders_by_integration_id_with_params(id, params).await {
            Err(err) if err.is_not_supported() => {
                debug!(integration_id = id, "parameterised sync not supported, retrying without params");
                provider.sync_orders_by_integration_id(id).await?;
            }
            other => other?,
        }
        self.record_sync(id).await;
        Ok(())
    }

    /// Sync every active integration of a tenant, one at a time.
    ///
    /// Integrations without a provider, or whose provider does not support
    /// sync, are skipped. Individual failures are logged and reported.
    #[instrument(skip(self), fields(operation = "sync_orders_by_business"))]
    pub async fn sync_orders_by_business(&self, business_id: BusinessId) -> Result<SyncReport> {
        let integrations = self.integrations.list_active_integrations_by_business(business_id).await?;
        let mut report = SyncReport::default();

        for integration in integrations {
            let Some(provider) = self.registry.get(integration.integration_type_id) else {
                report.skipped.push(integration.id);
                continue;
            };

            match provider.sync_orders_by_integration_id(integration.id).await {
                Ok(()) => {
                    self.record_sync(integration.id).await;
                    report.synced.push(integration.id);
                }
                Err(err) if err.is_not_supported() => report.skipped.push(integration.id),
                Err(err) => {
                    warn!(integration_id = integration.id, error = %err, "order sync failed");
                    report.failed.push(integration.id);
                }
            }
        }

        info!(
            business_id,
            synced = report.synced.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "tenant order sync finished"
        );
        Ok(report)
    }

    async fn record_sync(&self, id: IntegrationId) {
        if let Err(err) = self.update_last_sync(id, Utc::now()).await {
            warn!(integration_id = id, error = %err, "failed to record last sync time");
        }
    }
}
