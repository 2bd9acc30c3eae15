//! In-memory store ports.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use integrahub_core::{IntegrationCategoryRepository, IntegrationRepository, IntegrationTypeRepository};
use integrahub_domain::{
    BusinessId, HubError, Integration, IntegrationCategory, IntegrationFilters, IntegrationId,
    IntegrationSimple, IntegrationType, IntegrationTypeFilters, IntegrationTypeId, NewIntegration,
    Page, Result,
};
use parking_lot::Mutex;

#[derive(Default)]
pub struct MemoryIntegrationRepository {
    rows: Mutex<BTreeMap<IntegrationId, Integration>>,
    next_id: Mutex<IntegrationId>,
    /// Number of full-record writes (`update_integration`).
    pub updates: AtomicUsize,
}

impl MemoryIntegrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored row, ciphertext included.
    pub fn row(&self, id: IntegrationId) -> Option<Integration> {
        self.rows.lock().get(&id).cloned()
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Insert a row directly, bypassing the service.
    pub fn insert_row(&self, integration: Integration) {
        let mut rows = self.rows.lock();
        let mut next = self.next_id.lock();
        *next = (*next).max(integration.id);
        rows.insert(integration.id, integration);
    }
}

fn not_found(id: impl std::fmt::Display) -> HubError {
    HubError::not_found("integration", id)
}

#[async_trait]
impl IntegrationRepository for MemoryIntegrationRepository {
    async fn create_integration(&self, new: NewIntegration) -> Result<Integration> {
        let mut rows = self.rows.lock();
        if rows.values().any(|r| r.code == new.code && r.business_id == new.business_id) {
            return Err(HubError::DuplicateCode(new.code));
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let now = Utc::now();
        let integration = Integration {
            id,
            business_id: new.business_id,
            integration_type_id: new.integration_type_id,
            integration_type: None,
            code: new.code,
            name: new.name,
            store_id: new.store_id,
            config: new.config,
            credentials: new.credentials,
            is_active: new.is_active,
            is_default: new.is_default,
            is_testing: new.is_testing,
            last_sync_at: None,
            created_by: new.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(id, integration.clone());
        Ok(integration)
    }

    async fn update_integration(&self, integration: &Integration) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock();
        if rows.values().any(|r| {
            r.id != integration.id
                && r.code == integration.code
                && r.business_id == integration.business_id
        }) {
            return Err(HubError::DuplicateCode(integration.code.clone()));
        }
        let row = rows.get_mut(&integration.id).ok_or_else(|| not_found(integration.id))?;
        let is_default = row.is_default;
        *row = integration.clone();
        row.is_default = is_default;
        Ok(())
    }

    async fn get_integration_by_id(&self, id: IntegrationId) -> Result<Integration> {
        self.rows.lock().get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn get_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        self.rows
            .lock()
            .values()
            .find(|r| r.code == code && r.business_id == business_id)
            .cloned()
            .ok_or_else(|| not_found(code))
    }

    async fn list_integrations(&self, filters: &IntegrationFilters) -> Result<Page<Integration>> {
        let rows = self.rows.lock();
        let matching: Vec<_> = rows
            .values()
            .filter(|r| filters.integration_type_id.map_or(true, |t| r.integration_type_id == t))
            .filter(|r| filters.business_id.map_or(true, |b| r.business_id == Some(b)))
            .filter(|r| filters.is_active.map_or(true, |a| r.is_active == a))
            .filter(|r| {
                filters.search_term().map_or(true, |term| r.name.contains(term) || r.code.contains(term))
            })
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let page_size = filters.effective_page_size();
        let items = matching
            .into_iter()
            .skip(filters.offset() as usize)
            .take(page_size as usize)
            .collect();
        Ok(Page::new(items, total, filters.effective_page(), page_size))
    }

    async fn list_integrations_simple(
        &self,
        business_id: Option<BusinessId>,
        limit: u32,
    ) -> Result<Vec<IntegrationSimple>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|r| business_id.map_or(true, |b| r.business_id == Some(b)))
            .take(limit as usize)
            .map(Integration::to_simple)
            .collect())
    }

    async fn list_active_integrations(&self, offset: u64, limit: u32) -> Result<Vec<Integration>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|r| r.is_active)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_active_integrations_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Integration>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|r| r.is_active && r.business_id == Some(business_id))
            .cloned()
            .collect())
    }

    async fn list_integration_ids_by_type(
        &self,
        type_id: IntegrationTypeId,
    ) -> Result<Vec<IntegrationId>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|r| r.integration_type_id == type_id)
            .map(|r| r.id)
            .collect())
    }

    async fn get_active_integration_by_type_id(
        &self,
        type_id: IntegrationTypeId,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        let rows = self.rows.lock();
        let pick = |scope: Option<BusinessId>| {
            let mut candidates: Vec<_> = rows
                .values()
                .filter(|r| r.is_active && r.integration_type_id == type_id && r.business_id == scope)
                .collect();
            candidates.sort_by_key(|r| (!r.is_default, r.id));
            candidates.first().map(|r| (*r).clone())
        };
        business_id
            .and_then(|b| pick(Some(b)))
            .or_else(|| pick(None))
            .ok_or_else(|| not_found(format!("type {type_id}")))
    }

    async fn set_integration_as_default(&self, id: IntegrationId) -> Result<Vec<IntegrationId>> {
        let mut rows = self.rows.lock();
        let target = rows.get(&id).cloned().ok_or_else(|| not_found(id))?;
        let mut cleared = Vec::new();
        for row in rows.values_mut() {
            if row.id != id
                && row.is_default
                && row.integration_type_id == target.integration_type_id
                && row.business_id == target.business_id
            {
                row.is_default = false;
                cleared.push(row.id);
            }
        }
        if let Some(row) = rows.get_mut(&id) {
            row.is_default = true;
        }
        Ok(cleared)
    }

    async fn clear_integration_default(&self, id: IntegrationId) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id).ok_or_else(|| not_found(id))?;
        row.is_default = false;
        Ok(())
    }

    async fn exists_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<bool> {
        Ok(self.rows.lock().values().any(|r| r.code == code && r.business_id == business_id))
    }

    async fn update_last_sync(&self, id: IntegrationId, at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id).ok_or_else(|| not_found(id))?;
        row.last_sync_at = Some(at);
        Ok(())
    }

    async fn delete_integration(&self, id: IntegrationId) -> Result<()> {
        self.rows.lock().remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    async fn count_active_integrations_by_type(&self, type_id: IntegrationTypeId) -> Result<u64> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|r| r.is_active && r.integration_type_id == type_id)
            .count() as u64)
    }
}

#[derive(Default)]
pub struct MemoryTypeRepository {
    rows: Mutex<BTreeMap<IntegrationTypeId, (IntegrationType, bool)>>,
}

impl MemoryTypeRepository {
    pub fn with_types(types: impl IntoIterator<Item = IntegrationType>) -> Self {
        let repo = Self::default();
        for t in types {
            repo.rows.lock().insert(t.id, (t, false));
        }
        repo
    }

    pub fn is_deleted(&self, id: IntegrationTypeId) -> bool {
        self.rows.lock().get(&id).is_some_and(|(_, deleted)| *deleted)
    }
}

#[async_trait]
impl IntegrationTypeRepository for MemoryTypeRepository {
    async fn create_integration_type(&self, t: &IntegrationType) -> Result<IntegrationType> {
        let mut rows = self.rows.lock();
        let mut created = t.clone();
        if created.id == 0 {
            created.id = rows.keys().max().copied().unwrap_or(0) + 1;
        }
        rows.insert(created.id, (created.clone(), false));
        Ok(created)
    }

    async fn update_integration_type(&self, t: &IntegrationType) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&t.id).ok_or_else(|| HubError::not_found("integration type", t.id))?;
        row.0 = t.clone();
        Ok(())
    }

    async fn get_integration_type_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        self.rows
            .lock()
            .get(&id)
            .filter(|(_, deleted)| !deleted)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| HubError::not_found("integration type", id))
    }

    async fn get_integration_type_by_code(&self, code: &str) -> Result<IntegrationType> {
        self.rows
            .lock()
            .values()
            .find(|(t, deleted)| !deleted && t.code == code)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| HubError::not_found("integration type", code))
    }

    async fn list_integration_types(
        &self,
        filters: &IntegrationTypeFilters,
    ) -> Result<Vec<IntegrationType>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|(t, deleted)| {
                !deleted
                    && (!filters.active_only || t.is_active)
                    && filters.category_id.map_or(true, |c| t.category_id == c)
            })
            .map(|(t, _)| t.clone())
            .collect())
    }

    async fn exists_integration_type_by_code(&self, code: &str) -> Result<bool> {
        Ok(self.rows.lock().values().any(|(t, deleted)| !deleted && t.code == code))
    }

    async fn delete_integration_type(&self, id: IntegrationTypeId) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id).ok_or_else(|| HubError::not_found("integration type", id))?;
        row.1 = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCategoryRepository {
    rows: Mutex<BTreeMap<u64, IntegrationCategory>>,
}

impl MemoryCategoryRepository {
    pub fn with_categories(categories: impl IntoIterator<Item = IntegrationCategory>) -> Self {
        let repo = Self::default();
        for c in categories {
            repo.rows.lock().insert(c.id, c);
        }
        repo
    }
}

#[async_trait]
impl IntegrationCategoryRepository for MemoryCategoryRepository {
    async fn create_category(&self, category: &IntegrationCategory) -> Result<IntegrationCategory> {
        let mut rows = self.rows.lock();
        let mut created = category.clone();
        created.id = rows.keys().max().copied().unwrap_or(0) + 1;
        rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_category(&self, category: &IntegrationCategory) -> Result<()> {
        self.rows.lock().insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category_by_id(&self, id: u64) -> Result<IntegrationCategory> {
        self.rows.lock().get(&id).cloned().ok_or_else(|| HubError::not_found("category", id))
    }

    async fn get_category_by_code(&self, code: &str) -> Result<IntegrationCategory> {
        self.rows
            .lock()
            .values()
            .find(|c| c.code == code)
            .cloned()
            .ok_or_else(|| HubError::not_found("category", code))
    }

    async fn list_active_categories(&self) -> Result<Vec<IntegrationCategory>> {
        let mut categories: Vec<_> =
            self.rows.lock().values().filter(|c| c.is_active && c.is_visible).cloned().collect();
        categories.sort_by_key(|c| c.display_order);
        Ok(categories)
    }

    async fn list_categories(&self) -> Result<Vec<IntegrationCategory>> {
        Ok(self.rows.lock().values().cloned().collect())
    }

    async fn delete_category(&self, id: u64) -> Result<()> {
        self.rows.lock().remove(&id).map(|_| ()).ok_or_else(|| HubError::not_found("category", id))
    }
}
