use chrono::Utc;
use integrahub_common::validation::Validator;
use integrahub_domain::{HubError, Integration, IntegrationId, Result, UpdateIntegrationRequest};
use tracing::{debug, info, instrument};

use super::IntegrationService;

impl IntegrationService {
    /// Partial update: absent fields are left untouched.
    ///
    /// `updated_by == 0` leaves the audit stamp as it was.
    #[instrument(skip(self, request), fields(operation = "update_integration"))]
    pub async fn update_integration(
        &self,
        id: IntegrationId,
        request: UpdateIntegrationRequest,
    ) -> Result<Integration> {
        let mut integration = self
            .integrations
            .get_integration_by_id(id)
            .await
            .map_err(|e| e.with_context("update_integration"))?;

        if request.is_empty() {
            debug!(integration_id = id, "empty update, nothing to write");
            return Ok(integration);
        }

        let mut validator = Validator::new();
        if let Some(name) = &request.name {
            validator = validator.required("name", name);
        }
        if let Some(code) = &request.code {
            validator = validator.code("code", code);
        }
        validator.finish().map_err(|e| HubError::Validation(e.to_string()))?;

        if let Some(code) = request.code.as_deref().filter(|code| *code != integration.code) {
            if self.integrations.exists_integration_by_code(code, integration.business_id).await? {
                return Err(HubError::DuplicateCode(code.to_string()));
            }
        }

        if let Some(name) = request.name {
            integration.name = name;
        }
        if let Some(code) = request.code {
            integration.code = code;
        }
        if let Some(store_id) = request.store_id {
            integration.store_id = Some(store_id).filter(|s| !s.is_empty());
        }
        if let Some(config) = request.config {
            integration.config = config;
        }
        if let Some(is_active) = request.is_active {
            integration.is_active = is_active;
        }
        if let Some(is_testing) = request.is_testing {
            integration.is_testing = is_testing;
        }
        let becomes_default = request.is_default == Some(true) && !integration.is_default;
        let loses_default = request.is_default == Some(false) && integration.is_default;

        let new_credentials = match request.credentials {
            Some(credentials) => {
                integration.credentials = if credentials.is_empty() {
                    None
                } else {
                    Some(self.vault().encrypt_credentials(&credentials)?)
                };
                Some(credentials)
            }
            None => None,
        };

        if request.updated_by != 0 {
            integration.updated_by = Some(request.updated_by);
        }
        integration.updated_at = Utc::now();

        self.cache.invalidate_integration(id).await;
        self.integrations
            .update_integration(&integration)
            .await
            .map_err(|e| e.with_context("update_integration"))?;

        if becomes_default {
            let cleared = self.integrations.set_integration_as_default(id).await?;
            self.invalidate_all(&cleared).await;
            integration.is_default = true;
        } else if loses_default {
            self.integrations.clear_integration_default(id).await?;
            integration.is_default = false;
        }

        self.resolver.remember(&integration).await;
        if let Some(credentials) = &new_credentials {
            self.resolver.remember_credentials(id, credentials).await;
        }

        info!(
            integration_id = id,
            credentials_changed = new_credentials.is_some(),
            "integration updated"
        );
        Ok(integration)
    }
}
