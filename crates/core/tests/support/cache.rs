//! In-memory `IntegrationCache` that keeps the real keyspace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use integrahub_core::integrations::cache_keys;
use integrahub_core::{CacheLookup, CachedCredentials, IntegrationCache};
use integrahub_domain::{
    BusinessId, CredentialMap, HubError, Integration, IntegrationId, IntegrationTypeId, Result,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Raw JSON value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().get(key).and_then(|v| serde_json::from_str(v).ok())
    }

    fn put<T: Serialize>(&self, key: String, value: &T) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HubError::Cache("write refused".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().insert(key, serde_json::to_string(value)?);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<CacheLookup<T>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(HubError::Cache("read refused".into()));
        }
        match self.entries.lock().get(key) {
            Some(raw) => Ok(CacheLookup::Hit(serde_json::from_str(raw)?)),
            None => Ok(CacheLookup::Miss),
        }
    }
}

#[async_trait]
impl IntegrationCache for MemoryCache {
    async fn set_integration(&self, integration: &Integration) -> Result<()> {
        self.put(cache_keys::meta_key(integration.id), integration)?;
        self.put(cache_keys::code_key(&integration.code), &integration.id)?;
        if integration.is_active && integration.is_default {
            self.put(
                cache_keys::business_type_key(integration.business_id, integration.integration_type_id),
                &integration.id,
            )?;
        }
        Ok(())
    }

    async fn get_integration(&self, id: IntegrationId) -> Result<CacheLookup<Integration>> {
        self.get(&cache_keys::meta_key(id))
    }

    async fn get_integration_id_by_code(&self, code: &str) -> Result<CacheLookup<IntegrationId>> {
        self.get(&cache_keys::code_key(code))
    }

    async fn get_integration_id_by_business_and_type(
        &self,
        business_id: Option<BusinessId>,
        type_id: IntegrationTypeId,
    ) -> Result<CacheLookup<IntegrationId>> {
        self.get(&cache_keys::business_type_key(business_id, type_id))
    }

    async fn set_credentials(&self, id: IntegrationId, credentials: &CredentialMap) -> Result<()> {
        let cached = CachedCredentials { credentials: credentials.clone(), cached_at: Utc::now() };
        self.put(cache_keys::creds_key(id), &cached)
    }

    async fn get_credentials(&self, id: IntegrationId) -> Result<CacheLookup<CachedCredentials>> {
        self.get(&cache_keys::creds_key(id))
    }

    async fn set_platform_credentials(
        &self,
        type_id: IntegrationTypeId,
        credentials: &CredentialMap,
    ) -> Result<()> {
        self.put(cache_keys::platform_creds_key(type_id), credentials)
    }

    async fn get_platform_credentials(
        &self,
        type_id: IntegrationTypeId,
    ) -> Result<CacheLookup<CredentialMap>> {
        self.get(&cache_keys::platform_creds_key(type_id))
    }

    async fn invalidate_integration(&self, id: IntegrationId) {
        let mut entries = self.entries.lock();
        entries.remove(&cache_keys::meta_key(id));
        entries.remove(&cache_keys::creds_key(id));
    }

    async fn invalidate_platform_credentials(&self, type_id: IntegrationTypeId) {
        self.entries.lock().remove(&cache_keys::platform_creds_key(type_id));
    }
}
