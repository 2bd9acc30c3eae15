use integrahub_common::validation::Validator;
use integrahub_domain::{CreateIntegrationRequest, HubError, Integration, NewIntegration, Result};
use tracing::{info, instrument, warn, Span};

use super::connection::soft_validate_credentials;
use super::IntegrationService;

const MAX_NAME_LENGTH: usize = 255;
const MAX_CODE_LENGTH: usize = 100;

impl IntegrationService {
    /// Create an integration.
    ///
    /// With a registered provider the supplied credentials must pass its
    /// connection test before anything is persisted. Without one only a
    /// structural `access_token` check runs, and its failure is logged.
    #[instrument(
        skip(self, request),
        fields(
            operation = "create_integration",
            code = %request.code,
            integration_id = tracing::field::Empty,
            integration_type_code = tracing::field::Empty,
        )
    )]
    pub async fn create_integration(&self, request: CreateIntegrationRequest) -> Result<Integration> {
        Validator::new()
            .required("name", &request.name)
            .max_length("name", &request.name, MAX_NAME_LENGTH)
            .code("code", &request.code)
            .max_length("code", &request.code, MAX_CODE_LENGTH)
            .non_zero("integration_type_id", request.integration_type_id)
            .finish()
            .map_err(|e| HubError::Validation(e.to_string()))?;

        let integration_type =
            match self.types.get_integration_type_by_id(request.integration_type_id).await {
                Ok(found) => found,
                Err(err) if err.is_not_found() => {
                    return Err(HubError::Validation(format!(
                        "integration type {} does not exist",
                        request.integration_type_id
                    )));
                }
                Err(err) => return Err(err.with_context("create_integration")),
            };
        Span::current().record("integration_type_code", integration_type.code.as_str());

        if integration_type.category.is_none() && integration_type.category_id == 0 {
            return Err(HubError::Validation(format!(
                "integration type '{}' has no category",
                integration_type.code
            )));
        }

        let provider = self.registry.get(request.integration_type_id);
        if let Some(provider) = &provider {
            if !provider.tenancy().allows(request.business_id) {
                return Err(HubError::Validation(format!(
                    "business_id not allowed for integration type '{}' (tenancy: {})",
                    integration_type.code,
                    provider.tenancy()
                )));
            }
        }

        if self.integrations.exists_integration_by_code(&request.code, request.business_id).await? {
            return Err(HubError::DuplicateCode(request.code));
        }

        match &provider {
            Some(provider) => {
                provider.test_connection(&request.config, &request.credentials).await.map_err(
                    |err| match err {
                        HubError::TestFailed(_) => err,
                        other => HubError::TestFailed(other.to_string()),
                    },
                )?;
            }
            None => {
                if let Err(err) = soft_validate_credentials(&request.credentials) {
                    warn!(error = %err, "no provider registered and credentials lack an access token");
                }
            }
        }

        let sealed = if request.credentials.is_empty() {
            None
        } else {
            Some(self.vault().encrypt_credentials(&request.credentials)?)
        };

        let mut created = self
            .integrations
            .create_integration(NewIntegration {
                business_id: request.business_id,
                integration_type_id: request.integration_type_id,
                code: request.code,
                name: request.name,
                store_id: request.store_id,
                config: request.config,
                credentials: sealed,
                is_active: request.is_active,
                is_default: false,
                is_testing: request.is_testing,
                created_by: request.created_by.filter(|id| *id != 0),
            })
            .await?;
        Span::current().record("integration_id", created.id);

        if request.is_default {
            let cleared = self.integrations.set_integration_as_default(created.id).await?;
            self.invalidate_all(&cleared).await;
            created.is_default = true;
        }
        if created.integration_type.is_none() {
            created.integration_type = Some(integration_type);
        }

        self.resolver.remember(&created).await;
        self.resolver.remember_credentials(created.id, &request.credentials).await;
        self.observers.notify_created(&created, &self.shutdown);

        info!(
            integration_id = created.id,
            business_id = ?created.business_id,
            is_default = created.is_default,
            "integration created"
        );
        Ok(created)
    }
}
