//! In-process provider registry keyed by integration type id.

use std::collections::HashMap;
use std::sync::Arc;

use integrahub_domain::IntegrationTypeId;
use parking_lot::RwLock;
use tracing::{error, info, warn};

use super::provider::IntegrationProvider;

/// Map of `type_id -> provider`.
///
/// Writers take the exclusive lock briefly; lookups take the shared lock and
/// clone the `Arc` out, so no lock is held across a provider call.
#[derive(Default)]
pub struct IntegrationRegistry {
    providers: RwLock<HashMap<IntegrationTypeId, Arc<dyn IntegrationProvider>>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Type id 0 is rejected; re-registering replaces
    /// the previous provider.
    ///
    /// Returns whether the provider was stored.
    pub fn register(&self, type_id: IntegrationTypeId, provider: Arc<dyn IntegrationProvider>) -> bool {
        if type_id == 0 {
            error!(provider = provider.name(), "refusing to register provider for type id 0");
            return false;
        }

        let name = provider.name().to_string();
        let previous = self.providers.write().insert(type_id, provider);
        match previous {
            Some(old) => warn!(
                type_id,
                provider = %name,
                replaced = old.name(),
                "provider re-registered, previous instance replaced"
            ),
            None => info!(type_id, provider = %name, "provider registered"),
        }
        true
    }

    pub fn get(&self, type_id: IntegrationTypeId) -> Option<Arc<dyn IntegrationProvider>> {
        self.providers.read().get(&type_id).cloned()
    }

    pub fn contains(&self, type_id: IntegrationTypeId) -> bool {
        self.providers.read().contains_key(&type_id)
    }

    /// Registered type ids, ascending.
    pub fn list(&self) -> Vec<IntegrationTypeId> {
        let mut ids: Vec<_> = self.providers.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for IntegrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationRegistry").field("types", &self.list()).finish()
    }
}
