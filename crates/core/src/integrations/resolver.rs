//! Cache-first read path
//!
//! Every read consults the cache, falls through to the store on a miss (or a
//! cache fault) and repopulates the cache on the way out. Cache writes are
//! best-effort: failures are logged and swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use integrahub_domain::{
    BusinessId, CredentialMap, Integration, IntegrationId, IntegrationType,
    IntegrationTypeId, Result,
};
use tracing::{debug, instrument, warn};

use super::ports::{
    CacheLookup, IntegrationCache, IntegrationLookup, IntegrationRepository,
    IntegrationTypeRepository,
};
use super::vault::CredentialVault;

/// Read-side component shared by the services, providers and the invoicing
/// processor.
#[derive(Clone)]
pub struct IntegrationResolver {
    integrations: Arc<dyn IntegrationRepository>,
    types: Arc<dyn IntegrationTypeRepository>,
    cache: Arc<dyn IntegrationCache>,
    vault: CredentialVault,
}

impl IntegrationResolver {
    pub fn new(
        integrations: Arc<dyn IntegrationRepository>,
        types: Arc<dyn IntegrationTypeRepository>,
        cache: Arc<dyn IntegrationCache>,
        vault: CredentialVault,
    ) -> Self {
        Self { integrations, types, cache, vault }
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Cache-first metadata.
    #[instrument(skip(self), fields(operation = "resolve_integration"))]
    pub async fn integration(&self, id: IntegrationId) -> Result<Integration> {
        if let Some(integration) = hit(self.cache.get_integration(id).await, "meta") {
            return Ok(integration);
        }

        let integration = self.integrations.get_integration_by_id(id).await?;
        self.remember(&integration).await;
        Ok(integration)
    }

    /// Cache-first decrypted tenant credentials; empty when none are stored.
    #[instrument(skip(self), fields(operation = "resolve_credentials"))]
    pub async fn credentials(&self, id: IntegrationId) -> Result<CredentialMap> {
        if let Some(cached) = hit(self.cache.get_credentials(id).await, "creds") {
            return Ok(cached.credentials);
        }

        let integration = self.integrations.get_integration_by_id(id).await?;
        self.decrypt_and_remember(&integration).await
    }

    /// Decrypt the ciphertext carried by an already-loaded record, preferring
    /// the credentials cache.
    pub async fn credentials_for(&self, integration: &Integration) -> Result<CredentialMap> {
        if let Some(cached) = hit(self.cache.get_credentials(integration.id).await, "creds") {
            return Ok(cached.credentials);
        }
        if integration.credentials.is_none() {
            // Metadata from the cache never carries ciphertext.
            let stored = self.integrations.get_integration_by_id(integration.id).await?;
            return self.decrypt_and_remember(&stored).await;
        }
        self.decrypt_and_remember(integration).await
    }

    /// Cache-first platform credentials of a type, decrypted field by field.
    #[instrument(skip(self), fields(operation = "resolve_platform_credentials"))]
    pub async fn platform_credentials(&self, type_id: IntegrationTypeId) -> Result<CredentialMap> {
        if let Some(cached) = hit(self.cache.get_platform_credentials(type_id).await, "platform_creds")
        {
            return Ok(cached);
        }

        let integration_type = self.types.get_integration_type_by_id(type_id).await?;
        let Some(sealed) = integration_type.platform_credentials.as_ref() else {
            return Ok(CredentialMap::new());
        };
        let credentials = self
            .vault
            .decrypt_fields(sealed)
            .map_err(|e| e.with_context(format!("platform credentials of type {type_id}")))?;

        if !credentials.is_empty() {
            if let Err(err) = self.cache.set_platform_credentials(type_id, &credentials).await {
                warn!(type_id, error = %err, "failed to cache platform credentials");
            }
        }
        Ok(credentials)
    }

    pub async fn integration_type(&self, type_id: IntegrationTypeId) -> Result<IntegrationType> {
        self.types.get_integration_type_by_id(type_id).await
    }

    /// Active integration for `(type, tenant)`, tenant-scoped preferred over
    /// global.
    #[instrument(skip(self), fields(operation = "resolve_active_by_type"))]
    pub async fn active_integration_by_type(
        &self,
        type_id: IntegrationTypeId,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        let indexed =
            hit(self.cache.get_integration_id_by_business_and_type(business_id, type_id).await, "idx");
        if let Some(id) = indexed {
            match self.integration(id).await {
                Ok(found)
                    if found.is_active
                        && found.integration_type_id == type_id
                        && found.business_id == business_id =>
                {
                    return Ok(found);
                }
                Ok(_) => debug!(integration_id = id, "stale tenant/type index entry"),
                Err(err) if err.is_not_found() => {
                    debug!(integration_id = id, "tenant/type index points at a deleted record");
                }
                Err(err) => return Err(err),
            }
        }

        let integration =
            self.integrations.get_active_integration_by_type_id(type_id, business_id).await?;
        self.remember(&integration).await;
        Ok(integration)
    }

    /// Integration by code within a tenant scope (`None` = global).
    #[instrument(skip(self), fields(operation = "resolve_by_code"))]
    pub async fn integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        if let Some(id) = hit(self.cache.get_integration_id_by_code(code).await, "code") {
            match self.integration(id).await {
                Ok(found) if found.code == code && found.business_id == business_id => {
                    return Ok(found);
                }
                Ok(_) => debug!(integration_id = id, "code index entry belongs to another scope"),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        let integration = self.integrations.get_integration_by_code(code, business_id).await?;
        self.remember(&integration).await;
        Ok(integration)
    }

    /// Best-effort metadata write.
    pub(crate) async fn remember(&self, integration: &Integration) {
        if let Err(err) = self.cache.set_integration(integration).await {
            warn!(integration_id = integration.id, error = %err, "failed to cache integration metadata");
        }
    }

    /// Best-effort credentials write. Empty maps are not cached.
    pub(crate) async fn remember_credentials(&self, id: IntegrationId, credentials: &CredentialMap) {
        if credentials.is_empty() {
            return;
        }
        if let Err(err) = self.cache.set_credentials(id, credentials).await {
            warn!(integration_id = id, error = %err, "failed to cache credentials");
        }
    }

    /// Decrypt a record's ciphertext (empty when absent).
    pub(crate) fn decrypt(&self, integration: &Integration) -> Result<CredentialMap> {
        match integration.credentials.as_deref() {
            Some(sealed) if !sealed.is_empty() => self
                .vault
                .decrypt_credentials(sealed)
                .map_err(|e| e.with_context(format!("integration {}", integration.id))),
            _ => Ok(CredentialMap::new()),
        }
    }

    async fn decrypt_and_remember(&self, integration: &Integration) -> Result<CredentialMap> {
        let credentials = self.decrypt(integration)?;
        self.remember_credentials(integration.id, &credentials).await;
        debug!(
            integration_id = integration.id,
            fields = credentials.len(),
            decrypted_at = %Utc::now(),
            "credentials decrypted"
        );
        Ok(credentials)
    }
}

impl std::fmt::Debug for IntegrationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationResolver").finish_non_exhaustive()
    }
}

/// Collapse a cache read into an optional hit; faults degrade to a miss.
fn hit<T>(lookup: Result<CacheLookup<T>>, segment: &str) -> Option<T> {
    match lookup {
        Ok(lookup) => lookup.into_option(),
        Err(err) => {
            warn!(segment, error = %err, "cache read failed, falling back to store");
            None
        }
    }
}

#[async_trait]
impl IntegrationLookup for IntegrationResolver {
    async fn integration(&self, id: IntegrationId) -> Result<Integration> {
        Self::integration(self, id).await
    }

    async fn credentials(&self, id: IntegrationId) -> Result<CredentialMap> {
        Self::credentials(self, id).await
    }

    async fn platform_credentials(&self, type_id: IntegrationTypeId) -> Result<CredentialMap> {
        Self::platform_credentials(self, type_id).await
    }

    async fn integration_type(&self, type_id: IntegrationTypeId) -> Result<IntegrationType> {
        Self::integration_type(self, type_id).await
    }
}
