//! Integration type and category catalog service

use std::sync::Arc;

use chrono::Utc;
use integrahub_common::validation::Validator;
use integrahub_domain::{
    CreateCategoryRequest, CreateIntegrationTypeRequest, CredentialMap, HubError,
    IntegrationCategory, IntegrationType, IntegrationTypeFilters, IntegrationTypeId, Result,
    UpdateCategoryRequest, UpdateIntegrationTypeRequest,
};
use tracing::{info, instrument};

use super::ports::{
    IntegrationCache, IntegrationCategoryRepository, IntegrationRepository,
    IntegrationTypeRepository,
};
use super::resolver::IntegrationResolver;
use super::vault::CredentialVault;

pub struct IntegrationTypeService {
    types: Arc<dyn IntegrationTypeRepository>,
    categories: Arc<dyn IntegrationCategoryRepository>,
    integrations: Arc<dyn IntegrationRepository>,
    cache: Arc<dyn IntegrationCache>,
    resolver: IntegrationResolver,
}

impl IntegrationTypeService {
    pub fn new(
        types: Arc<dyn IntegrationTypeRepository>,
        categories: Arc<dyn IntegrationCategoryRepository>,
        integrations: Arc<dyn IntegrationRepository>,
        cache: Arc<dyn IntegrationCache>,
        vault: CredentialVault,
    ) -> Self {
        let resolver = IntegrationResolver::new(
            Arc::clone(&integrations),
            Arc::clone(&types),
            Arc::clone(&cache),
            vault,
        );
        Self { types, categories, integrations, cache, resolver }
    }

    // Integration types
    // -----------------------------------------------------------------

    #[instrument(skip(self, request), fields(operation = "create_integration_type", code = %request.code))]
    pub async fn create_integration_type(
        &self,
        request: CreateIntegrationTypeRequest,
    ) -> Result<IntegrationType> {
        Validator::new()
            .code("code", &request.code)
            .required("name", &request.name)
            .non_zero("category_id", request.category_id)
            .finish()
            .map_err(|e| HubError::Validation(e.to_string()))?;

        let category = self.existing_category(request.category_id).await?;
        if self.types.exists_integration_type_by_code(&request.code).await? {
            return Err(HubError::DuplicateCode(request.code));
        }

        let now = Utc::now();
        let integration_type = IntegrationType {
            id: request.id.unwrap_or(0),
            code: request.code,
            name: request.name,
            description: request.description,
            icon_url: request.icon_url,
            category_id: category.id,
            category: Some(category),
            is_active: request.is_active,
            in_development: request.in_development,
            config_schema: request.config_schema,
            credentials_schema: request.credentials_schema,
            base_url: request.base_url,
            base_url_test: request.base_url_test,
            platform_credentials: self.seal_platform_credentials(request.platform_credentials)?,
            created_at: now,
            updated_at: now,
        };

        let created = self.types.create_integration_type(&integration_type).await?;
        info!(type_id = created.id, code = %created.code, "integration type created");
        Ok(created)
    }

    /// Update a type and drop every cache entry derived from it.
    #[instrument(skip(self, request), fields(operation = "update_integration_type"))]
    pub async fn update_integration_type(
        &self,
        id: IntegrationTypeId,
        request: UpdateIntegrationTypeRequest,
    ) -> Result<IntegrationType> {
        let mut integration_type = self.types.get_integration_type_by_id(id).await?;

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(HubError::Validation("name: is required".into()));
            }
            integration_type.name = name;
        }
        if let Some(category_id) = request.category_id {
            let category = self.existing_category(category_id).await?;
            integration_type.category_id = category.id;
            integration_type.category = Some(category);
        }
        if request.description.is_some() {
            integration_type.description = request.description;
        }
        if request.icon_url.is_some() {
            integration_type.icon_url = request.icon_url;
        }
        if let Some(is_active) = request.is_active {
            integration_type.is_active = is_active;
        }
        if let Some(in_development) = request.in_development {
            integration_type.in_development = in_development;
        }
        if request.config_schema.is_some() {
            integration_type.config_schema = request.config_schema;
        }
        if request.credentials_schema.is_some() {
            integration_type.credentials_schema = request.credentials_schema;
        }
        if request.base_url.is_some() {
            integration_type.base_url = request.base_url;
        }
        if request.base_url_test.is_some() {
            integration_type.base_url_test = request.base_url_test;
        }
        if request.platform_credentials.is_some() {
            integration_type.platform_credentials =
                self.seal_platform_credentials(request.platform_credentials)?;
        }
        integration_type.updated_at = Utc::now();

        self.cache.invalidate_platform_credentials(id).await;
        self.types.update_integration_type(&integration_type).await?;

        let affected = self.integrations.list_integration_ids_by_type(id).await?;
        for integration_id in &affected {
            self.cache.invalidate_integration(*integration_id).await;
        }
        info!(type_id = id, invalidated = affected.len(), "integration type updated");
        Ok(integration_type)
    }

    /// Soft delete, refused while active integrations reference the type.
    #[instrument(skip(self), fields(operation = "delete_integration_type"))]
    pub async fn delete_integration_type(&self, id: IntegrationTypeId) -> Result<()> {
        let integration_type = self.types.get_integration_type_by_id(id).await?;

        let active = self.integrations.count_active_integrations_by_type(id).await?;
        if active > 0 {
            return Err(HubError::HasIntegrations(format!(
                "integration type '{}' has {active} active integration(s)",
                integration_type.code
            )));
        }

        self.types.delete_integration_type(id).await?;
        self.cache.invalidate_platform_credentials(id).await;
        info!(type_id = id, code = %integration_type.code, "integration type deleted");
        Ok(())
    }

    pub async fn get_integration_type_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        self.types.get_integration_type_by_id(id).await
    }

    pub async fn get_integration_type_by_code(&self, code: &str) -> Result<IntegrationType> {
        self.types.get_integration_type_by_code(code).await
    }

    pub async fn list_integration_types(
        &self,
        filters: &IntegrationTypeFilters,
    ) -> Result<Vec<IntegrationType>> {
        self.types.list_integration_types(filters).await
    }

    pub async fn list_active_integration_types(&self) -> Result<Vec<IntegrationType>> {
        self.types
            .list_integration_types(&IntegrationTypeFilters { category_id: None, active_only: true })
            .await
    }

    /// Decrypted platform credentials (cached 24 h).
    pub async fn get_platform_credentials(&self, id: IntegrationTypeId) -> Result<CredentialMap> {
        self.resolver.platform_credentials(id).await
    }

    fn seal_platform_credentials(
        &self,
        credentials: Option<CredentialMap>,
    ) -> Result<Option<std::collections::BTreeMap<String, String>>> {
        match credentials {
            Some(credentials) if !credentials.is_empty() => {
                self.resolver.vault().encrypt_fields(&credentials).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn existing_category(&self, id: u64) -> Result<IntegrationCategory> {
        match self.categories.get_category_by_id(id).await {
            Err(err) if err.is_not_found() => {
                Err(HubError::Validation(format!("category {id} does not exist")))
            }
            other => other,
        }
    }

    // Categories
    // -----------------------------------------------------------------

    #[instrument(skip(self, request), fields(operation = "create_category", code = %request.code))]
    pub async fn create_category(&self, request: CreateCategoryRequest) -> Result<IntegrationCategory> {
        Validator::new()
            .code("code", &request.code)
            .required("name", &request.name)
            .finish()
            .map_err(|e| HubError::Validation(e.to_string()))?;

        match self.categories.get_category_by_code(&request.code).await {
            Ok(_) => return Err(HubError::DuplicateCode(request.code)),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        if let Some(parent) = request.parent_category_id {
            self.existing_category(parent).await?;
        }

        let now = Utc::now();
        self.categories
            .create_category(&IntegrationCategory {
                id: 0,
                code: request.code,
                name: request.name,
                description: request.description,
                parent_category_id: request.parent_category_id,
                is_active: true,
                is_visible: request.is_visible.unwrap_or(true),
                display_order: request.display_order,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn update_category(
        &self,
        id: u64,
        request: UpdateCategoryRequest,
    ) -> Result<IntegrationCategory> {
        let mut category = self.categories.get_category_by_id(id).await?;
        if let Some(name) = request.name {
            category.name = name;
        }
        if request.description.is_some() {
            category.description = request.description;
        }
        if let Some(is_active) = request.is_active {
            category.is_active = is_active;
        }
        if let Some(is_visible) = request.is_visible {
            category.is_visible = is_visible;
        }
        if let Some(display_order) = request.display_order {
            category.display_order = display_order;
        }
        category.updated_at = Utc::now();
        self.categories.update_category(&category).await?;
        Ok(category)
    }

    pub async fn get_category_by_id(&self, id: u64) -> Result<IntegrationCategory> {
        self.categories.get_category_by_id(id).await
    }

    /// Active and visible categories by display order.
    pub async fn list_active_categories(&self) -> Result<Vec<IntegrationCategory>> {
        self.categories.list_active_categories().await
    }

    pub async fn list_categories(&self) -> Result<Vec<IntegrationCategory>> {
        self.categories.list_categories().await
    }

    pub async fn delete_category(&self, id: u64) -> Result<()> {
        self.categories.delete_category(id).await
    }
}
