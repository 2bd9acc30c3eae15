//! Integration cache backed by moka
//!
//! Keys and TTLs follow [`cache_keys`]; every value is stored as a JSON
//! string so the keyspace reads the same as a remote key/value store.
//! TTL is chosen per key by a moka [`Expiry`] and is reset on overwrite.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use integrahub_core::integrations::cache_keys;
use integrahub_core::{CacheLookup, CachedCredentials, IntegrationCache};
use integrahub_domain::{
    BusinessId, CredentialMap, HubError, Integration, IntegrationId, IntegrationTypeId, Result,
};
use moka::future::Cache;
use moka::Expiry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Per-key TTL derived from the key segment.
struct KeyTtl;

impl Expiry<String, String> for KeyTtl {
    fn expire_after_create(&self, key: &String, _value: &String, _created_at: Instant) -> Option<Duration> {
        Some(cache_keys::ttl_for(key))
    }

    fn expire_after_update(
        &self,
        key: &String,
        _value: &String,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(cache_keys::ttl_for(key))
    }
}

/// In-process [`IntegrationCache`].
#[derive(Clone)]
pub struct MokaIntegrationCache {
    entries: Cache<String, String>,
}

impl MokaIntegrationCache {
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .name("integrahub-integrations")
            .max_capacity(max_capacity.max(1))
            .expire_after(KeyTtl)
            .build();
        tracing::info!(max_capacity, "integration cache initialised");
        Self { entries }
    }

    /// Number of live entries (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.get(key).await.is_some()
    }

    /// Flush pending maintenance so counts and evictions are observable.
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }

    async fn put<T: Serialize + ?Sized>(&self, key: String, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| HubError::Cache(format!("encode {key}: {e}")))?;
        self.entries.insert(key, encoded).await;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<CacheLookup<T>> {
        let Some(raw) = self.entries.get(key).await else {
            return Ok(CacheLookup::Miss);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(CacheLookup::Hit(value)),
            Err(e) => {
                // An undecodable entry is dropped and reported, never served.
                self.entries.invalidate(key).await;
                Err(HubError::Cache(format!("decode {key}: {e}")))
            }
        }
    }

    /// Drop an index key only while it still points at `id`.
    async fn invalidate_index(&self, key: String, id: IntegrationId) {
        if let Ok(CacheLookup::Hit(indexed)) = self.fetch::<IntegrationId>(&key).await {
            if indexed == id {
                self.entries.invalidate(&key).await;
            }
        }
    }
}

impl std::fmt::Debug for MokaIntegrationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaIntegrationCache")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl IntegrationCache for MokaIntegrationCache {
    async fn set_integration(&self, integration: &Integration) -> Result<()> {
        self.put(cache_keys::meta_key(integration.id), integration).await?;
        self.put(cache_keys::code_key(&integration.code), &integration.id).await?;
        if integration.is_active && integration.is_default {
            self.put(
                cache_keys::business_type_key(integration.business_id, integration.integration_type_id),
                &integration.id,
            )
            .await?;
        }
        Ok(())
    }

    async fn get_integration(&self, id: IntegrationId) -> Result<CacheLookup<Integration>> {
        self.fetch(&cache_keys::meta_key(id)).await
    }

    async fn get_integration_id_by_code(&self, code: &str) -> Result<CacheLookup<IntegrationId>> {
        self.fetch(&cache_keys::code_key(code)).await
    }

    async fn get_integration_id_by_business_and_type(
        &self,
        business_id: Option<BusinessId>,
        type_id: IntegrationTypeId,
    ) -> Result<CacheLookup<IntegrationId>> {
        self.fetch(&cache_keys::business_type_key(business_id, type_id)).await
    }

    async fn set_credentials(&self, id: IntegrationId, credentials: &CredentialMap) -> Result<()> {
        let cached = CachedCredentials { credentials: credentials.clone(), cached_at: Utc::now() };
        self.put(cache_keys::creds_key(id), &cached).await
    }

    async fn get_credentials(&self, id: IntegrationId) -> Result<CacheLookup<CachedCredentials>> {
        self.fetch(&cache_keys::creds_key(id)).await
    }

    async fn set_platform_credentials(
        &self,
        type_id: IntegrationTypeId,
        credentials: &CredentialMap,
    ) -> Result<()> {
        self.put(cache_keys::platform_creds_key(type_id), credentials).await
    }

    async fn get_platform_credentials(
        &self,
        type_id: IntegrationTypeId,
    ) -> Result<CacheLookup<CredentialMap>> {
        self.fetch(&cache_keys::platform_creds_key(type_id)).await
    }

    async fn invalidate_integration(&self, id: IntegrationId) {
        let meta_key = cache_keys::meta_key(id);
        match self.fetch::<Integration>(&meta_key).await {
            Ok(CacheLookup::Hit(cached)) => {
                self.invalidate_index(cache_keys::code_key(&cached.code), id).await;
                self.invalidate_index(
                    cache_keys::business_type_key(cached.business_id, cached.integration_type_id),
                    id,
                )
                .await;
            }
            Ok(CacheLookup::Miss) => {}
            Err(err) => warn!(integration_id = id, error = %err, "cached metadata unreadable"),
        }
        self.entries.invalidate(&meta_key).await;
        self.entries.invalidate(&cache_keys::creds_key(id)).await;
        debug!(integration_id = id, "integration cache invalidated");
    }

    async fn invalidate_platform_credentials(&self, type_id: IntegrationTypeId) {
        self.entries.invalidate(&cache_keys::platform_creds_key(type_id)).await;
    }
}
