use integrahub_domain::{Result, WarmCacheReport};
use tracing::{info, instrument, warn};

use super::IntegrationService;

impl IntegrationService {
    /// Page through every active integration and cache its metadata and
    /// decrypted credentials. Row failures are counted and skipped.
    #[instrument(skip(self), fields(operation = "warm_cache"))]
    pub async fn warm_cache(&self) -> Result<WarmCacheReport> {
        let mut report = WarmCacheReport::default();
        let mut offset = 0u64;

        loop {
            let page = self.integrations.list_active_integrations(offset, self.warm_page_size).await?;
            let fetched = page.len();

            for integration in &page {
                match self.cache.set_integration(integration).await {
                    Ok(()) => report.metadata_cached += 1,
                    Err(err) => {
                        warn!(integration_id = integration.id, error = %err, "warm: metadata not cached");
                        report.errors += 1;
                    }
                }

                if !integration.has_credentials() {
                    continue;
                }
                let credentials = match self.resolver.decrypt(integration) {
                    Ok(credentials) if credentials.is_empty() => continue,
                    Ok(credentials) => credentials,
                    Err(err) => {
                        warn!(integration_id = integration.id, error = %err, "warm: credentials not decrypted");
                        report.errors += 1;
                        continue;
                    }
                };
                match self.cache.set_credentials(integration.id, &credentials).await {
                    Ok(()) => report.credentials_cached += 1,
                    Err(err) => {
                        warn!(integration_id = integration.id, error = %err, "warm: credentials not cached");
                        report.errors += 1;
                    }
                }
            }

            if fetched < self.warm_page_size as usize {
                break;
            }
            offset += fetched as u64;
        }

        info!(
            metadata = report.metadata_cached,
            credentials = report.credentials_cached,
            errors = report.errors,
            "cache warmed"
        );
        Ok(report)
    }
}
