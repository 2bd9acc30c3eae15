use integrahub_domain::constants::SIMPLE_LIST_LIMIT;
use integrahub_domain::{
    BusinessId, CredentialMap, Integration, IntegrationFilters, IntegrationId, IntegrationSimple,
    IntegrationTypeId, IntegrationWithCredentials, Page, PublicIntegration, Result,
};
use tracing::instrument;

use super::IntegrationService;

impl IntegrationService {
    /// Metadata only; never decrypts.
    #[instrument(skip(self), fields(operation = "get_integration_by_id"))]
    pub async fn get_integration_by_id(&self, id: IntegrationId) -> Result<Integration> {
        self.resolver.integration(id).await.map_err(|e| e.with_context("get_integration_by_id"))
    }

    /// Metadata plus decrypted credentials. Admin callers only.
    #[instrument(skip(self), fields(operation = "get_integration_by_id_with_credentials"))]
    pub async fn get_integration_by_id_with_credentials(
        &self,
        id: IntegrationId,
    ) -> Result<IntegrationWithCredentials> {
        let integration = self.resolver.integration(id).await?;
        let credentials = self
            .resolver
            .credentials_for(&integration)
            .await
            .map_err(|e| e.with_context("get_integration_by_id_with_credentials"))?;
        Ok(IntegrationWithCredentials { integration, credentials })
    }

    /// Active integration for a type code; tenant-scoped preferred over
    /// global.
    #[instrument(skip(self), fields(operation = "get_integration_by_type"))]
    pub async fn get_integration_by_type(
        &self,
        type_code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        let integration_type = self
            .types
            .get_integration_type_by_code(type_code)
            .await
            .map_err(|e| e.with_context("get_integration_by_type"))?;
        self.get_integration_by_type_id(integration_type.id, business_id).await
    }

    #[instrument(skip(self), fields(operation = "get_integration_by_type_id"))]
    pub async fn get_integration_by_type_id(
        &self,
        type_id: IntegrationTypeId,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        self.resolver
            .active_integration_by_type(type_id, business_id)
            .await
            .map_err(|e| e.with_context(format!("active integration of type {type_id}")))
    }

    #[instrument(skip(self), fields(operation = "get_integration_by_code"))]
    pub async fn get_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        self.resolver
            .integration_by_code(code, business_id)
            .await
            .map_err(|e| e.with_context("get_integration_by_code"))
    }

    /// Projection for other subsystems. Never carries credentials.
    pub async fn get_public_integration_by_id(&self, id: IntegrationId) -> Result<PublicIntegration> {
        self.get_integration_by_id(id).await.map(|integration| integration.to_public())
    }

    #[instrument(skip(self, filters), fields(operation = "list_integrations"))]
    pub async fn list_integrations(&self, filters: &IntegrationFilters) -> Result<Page<Integration>> {
        self.integrations.list_integrations(filters).await
    }

    pub async fn list_integrations_simple(
        &self,
        business_id: Option<BusinessId>,
    ) -> Result<Vec<IntegrationSimple>> {
        self.integrations.list_integrations_simple(business_id, SIMPLE_LIST_LIMIT).await
    }

    pub async fn get_decrypted_credentials(&self, id: IntegrationId) -> Result<CredentialMap> {
        self.resolver.credentials(id).await
    }

    pub async fn get_platform_credentials(&self, type_id: IntegrationTypeId) -> Result<CredentialMap> {
        self.resolver.platform_credentials(type_id).await
    }
}
