//! Port interfaces for the integration core
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations (store, cache).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use integrahub_domain::{
    BusinessId, CredentialMap, Integration, IntegrationCategory, IntegrationFilters,
    IntegrationId, IntegrationSimple, IntegrationType, IntegrationTypeFilters, IntegrationTypeId,
    NewIntegration, Page, Result,
};
use serde::{Deserialize, Serialize};

/// Durable store for integration records.
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    /// Persist a new integration (credentials already ciphertext).
    ///
    /// Fails with `DuplicateCode` when the code is taken within its scope.
    async fn create_integration(&self, integration: NewIntegration) -> Result<Integration>;

    /// Full-record update.
    async fn update_integration(&self, integration: &Integration) -> Result<()>;

    /// Fetch by id with the integration type preloaded when available.
    async fn get_integration_by_id(&self, id: IntegrationId) -> Result<Integration>;

    /// Fetch by code within a tenant scope (`None` = global).
    async fn get_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<Integration>;

    /// Paginated listing; page size is clamped to `[1, 100]`.
    async fn list_integrations(&self, filters: &IntegrationFilters) -> Result<Page<Integration>>;

    /// Minimal projection, at most `limit` rows.
    async fn list_integrations_simple(
        &self,
        business_id: Option<BusinessId>,
        limit: u32,
    ) -> Result<Vec<IntegrationSimple>>;

    /// Unclamped page over every active integration, ordered by id.
    async fn list_active_integrations(&self, offset: u64, limit: u32) -> Result<Vec<Integration>>;

    /// Every active integration of one tenant.
    async fn list_active_integrations_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Integration>>;

    /// Ids of every integration referencing a type.
    async fn list_integration_ids_by_type(
        &self,
        type_id: IntegrationTypeId,
    ) -> Result<Vec<IntegrationId>>;

    /// At most one active record for `(type, tenant)`; prefers the exact
    /// tenant over a global record when `business_id` is set.
    async fn get_active_integration_by_type_id(
        &self,
        type_id: IntegrationTypeId,
        business_id: Option<BusinessId>,
    ) -> Result<Integration>;

    /// Transactionally clear the default flag on every sibling sharing
    /// `(type, tenant)` and set it on `id`.
    ///
    /// Returns the ids whose default flag was cleared.
    async fn set_integration_as_default(&self, id: IntegrationId) -> Result<Vec<IntegrationId>>;

    async fn clear_integration_default(&self, id: IntegrationId) -> Result<()>;

    /// Uniqueness check.
    async fn exists_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<bool>;

    /// Timestamp bump only.
    async fn update_last_sync(&self, id: IntegrationId, at: DateTime<Utc>) -> Result<()>;

    async fn delete_integration(&self, id: IntegrationId) -> Result<()>;

    async fn count_active_integrations_by_type(&self, type_id: IntegrationTypeId) -> Result<u64>;
}

/// Durable store for integration types.
#[async_trait]
pub trait IntegrationTypeRepository: Send + Sync {
    /// Insert a type. A non-zero `id` is kept as the stable routing key;
    /// zero lets the store assign one.
    async fn create_integration_type(&self, integration_type: &IntegrationType)
        -> Result<IntegrationType>;

    async fn update_integration_type(&self, integration_type: &IntegrationType) -> Result<()>;

    /// Fetch by id with its category preloaded. Soft-deleted types are absent.
    async fn get_integration_type_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType>;

    async fn get_integration_type_by_code(&self, code: &str) -> Result<IntegrationType>;

    async fn list_integration_types(
        &self,
        filters: &IntegrationTypeFilters,
    ) -> Result<Vec<IntegrationType>>;

    async fn exists_integration_type_by_code(&self, code: &str) -> Result<bool>;

    /// Soft delete.
    async fn delete_integration_type(&self, id: IntegrationTypeId) -> Result<()>;
}

/// Durable store for integration categories.
#[async_trait]
pub trait IntegrationCategoryRepository: Send + Sync {
    async fn create_category(&self, category: &IntegrationCategory) -> Result<IntegrationCategory>;

    async fn update_category(&self, category: &IntegrationCategory) -> Result<()>;

    async fn get_category_by_id(&self, id: u64) -> Result<IntegrationCategory>;

    async fn get_category_by_code(&self, code: &str) -> Result<IntegrationCategory>;

    /// Active and visible categories ordered by `display_order` ascending.
    async fn list_active_categories(&self) -> Result<Vec<IntegrationCategory>>;

    async fn list_categories(&self) -> Result<Vec<IntegrationCategory>>;

    /// Refused while types reference the category.
    async fn delete_category(&self, id: u64) -> Result<()>;
}

/// Result of a cache read. A miss is a signal to fall through to the store,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
}

impl<T> CacheLookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss => None,
        }
    }

    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Plaintext credentials as stored under `integration:creds:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCredentials {
    pub credentials: CredentialMap,
    pub cached_at: DateTime<Utc>,
}

/// Multi-index cache fronting the store.
///
/// Keyspace and TTLs are fixed by [`crate::integrations::cache_keys`].
#[async_trait]
pub trait IntegrationCache: Send + Sync {
    /// Write the metadata blob plus the code index, and the
    /// `(tenant, type)` index when the integration is the active default.
    async fn set_integration(&self, integration: &Integration) -> Result<()>;

    async fn get_integration(&self, id: IntegrationId) -> Result<CacheLookup<Integration>>;

    async fn get_integration_id_by_code(&self, code: &str) -> Result<CacheLookup<IntegrationId>>;

    async fn get_integration_id_by_business_and_type(
        &self,
        business_id: Option<BusinessId>,
        type_id: IntegrationTypeId,
    ) -> Result<CacheLookup<IntegrationId>>;

    /// Stamp `cached_at` and store the plaintext map.
    async fn set_credentials(&self, id: IntegrationId, credentials: &CredentialMap) -> Result<()>;

    async fn get_credentials(&self, id: IntegrationId) -> Result<CacheLookup<CachedCredentials>>;

    async fn set_platform_credentials(
        &self,
        type_id: IntegrationTypeId,
        credentials: &CredentialMap,
    ) -> Result<()>;

    async fn get_platform_credentials(
        &self,
        type_id: IntegrationTypeId,
    ) -> Result<CacheLookup<CredentialMap>>;

    /// Drop meta and creds keys. Tolerates partial failure (logs only).
    async fn invalidate_integration(&self, id: IntegrationId);

    async fn invalidate_platform_credentials(&self, type_id: IntegrationTypeId);
}

/// Read-side view used by providers and the invoicing fabric to load what
/// they need for one integration.
#[async_trait]
pub trait IntegrationLookup: Send + Sync {
    /// Cache-first integration metadata.
    async fn integration(&self, id: IntegrationId) -> Result<Integration>;

    /// Cache-first decrypted tenant credentials (empty when none stored).
    async fn credentials(&self, id: IntegrationId) -> Result<CredentialMap>;

    /// Cache-first platform credentials of a type, decrypted field by field.
    async fn platform_credentials(&self, type_id: IntegrationTypeId) -> Result<CredentialMap>;

    async fn integration_type(&self, type_id: IntegrationTypeId) -> Result<IntegrationType>;
}

/// Field-level ciphertext as stored on an integration type.
pub type SealedFields = BTreeMap<String, String>;
