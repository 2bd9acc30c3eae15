//! Integration service - the single mutator of integration state
//!
//! Writes follow one order per integration id: invalidate the cache, write
//! the store, repopulate the cache. Reads go through
//! [`IntegrationResolver`]. Operations that reach a third party resolve the
//! provider through the [`IntegrationRegistry`].

mod connection;
mod create;
mod lifecycle;
mod read;
mod sync;
mod update;
mod warm;
mod webhooks;

use std::sync::Arc;

use integrahub_domain::constants::WARM_CACHE_PAGE_SIZE;
use integrahub_domain::{HubError, Integration, IntegrationId, IntegrationTypeId, Result};
use tokio_util::sync::CancellationToken;

pub use self::connection::soft_validate_credentials;
use super::observers::{IntegrationObserver, ObserverList};
use super::ports::{IntegrationCache, IntegrationRepository, IntegrationTypeRepository};
use super::provider::IntegrationProvider;
use super::registry::IntegrationRegistry;
use super::resolver::IntegrationResolver;
use super::vault::CredentialVault;

/// Integration lifecycle service
pub struct IntegrationService {
    integrations: Arc<dyn IntegrationRepository>,
    types: Arc<dyn IntegrationTypeRepository>,
    cache: Arc<dyn IntegrationCache>,
    registry: Arc<IntegrationRegistry>,
    resolver: IntegrationResolver,
    observers: ObserverList,
    webhook_base_url: Option<String>,
    warm_page_size: u32,
    shutdown: CancellationToken,
}

impl IntegrationService {
    pub fn new(
        integrations: Arc<dyn IntegrationRepository>,
        types: Arc<dyn IntegrationTypeRepository>,
        cache: Arc<dyn IntegrationCache>,
        vault: CredentialVault,
        registry: Arc<IntegrationRegistry>,
    ) -> Self {
        let resolver = IntegrationResolver::new(
            Arc::clone(&integrations),
            Arc::clone(&types),
            Arc::clone(&cache),
            vault,
        );
        Self {
            integrations,
            types,
            cache,
            registry,
            resolver,
            observers: ObserverList::new(),
            webhook_base_url: None,
            warm_page_size: WARM_CACHE_PAGE_SIZE,
            shutdown: CancellationToken::new(),
        }
    }

    /// Public base URL handed to providers for webhook callbacks.
    pub fn with_webhook_base_url(mut self, base_url: Option<String>) -> Self {
        self.webhook_base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    pub fn with_warm_page_size(mut self, page_size: u32) -> Self {
        self.warm_page_size = page_size.max(1);
        self
    }

    /// Parent token for observer tasks. Cancelling it stops in-flight
    /// observers.
    pub fn with_shutdown_token(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn resolver(&self) -> &IntegrationResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<IntegrationRegistry> {
        &self.registry
    }

    pub fn webhook_base_url(&self) -> Option<&str> {
        self.webhook_base_url.as_deref()
    }

    /// Bind a provider to an integration type id.
    pub fn register_provider(
        &self,
        type_id: IntegrationTypeId,
        provider: Arc<dyn IntegrationProvider>,
    ) -> bool {
        self.registry.register(type_id, provider)
    }

    /// Notify `observer` for every created integration.
    pub fn register_observer(&self, observer: Arc<dyn IntegrationObserver>) {
        self.observers.register(observer);
    }

    /// Notify `observer` for created integrations of one type.
    pub fn on_integration_created(
        &self,
        type_id: IntegrationTypeId,
        observer: Arc<dyn IntegrationObserver>,
    ) {
        self.observers.register_for_type(type_id, observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Cancel in-flight observer tasks.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn vault(&self) -> &CredentialVault {
        self.resolver.vault()
    }

    fn require_provider(&self, integration: &Integration) -> Result<Arc<dyn IntegrationProvider>> {
        self.registry.get(integration.integration_type_id).ok_or_else(|| {
            HubError::ProviderUnregistered(format!(
                "integration type {} (integration {})",
                integration.integration_type_id, integration.id
            ))
        })
    }

    /// Drop cached entries for every id whose default flag was cleared.
    async fn invalidate_all(&self, ids: &[IntegrationId]) {
        for id in ids {
            self.cache.invalidate_integration(*id).await;
        }
    }
}

impl std::fmt::Debug for IntegrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationService")
            .field("registry", &self.registry)
            .field("observers", &self.observers)
            .field("webhook_base_url", &self.webhook_base_url)
            .field("warm_page_size", &self.warm_page_size)
            .finish_non_exhaustive()
    }
}
