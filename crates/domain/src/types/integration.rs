//! Integration records and their request/response projections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BusinessId, CredentialMap, IntegrationId, IntegrationType, IntegrationTypeId, JsonMap};

/// A tenant's configured instance of an integration type.
///
/// `credentials` holds ciphertext (`nonce || ciphertext || tag`) and is never
/// serialized, so the serialized form doubles as the cached metadata blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub id: IntegrationId,
    pub business_id: Option<BusinessId>,
    pub integration_type_id: IntegrationTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<IntegrationType>,
    pub code: String,
    pub name: String,
    pub store_id: Option<String>,
    #[serde(default)]
    pub config: JsonMap,
    #[serde(skip)]
    pub credentials: Option<Vec<u8>>,
    pub is_active: bool,
    pub is_default: bool,
    pub is_testing: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Code of the preloaded type, when available.
    pub fn type_code(&self) -> Option<&str> {
        self.integration_type.as_ref().map(|t| t.code.as_str())
    }

    pub fn to_public(&self) -> PublicIntegration {
        PublicIntegration {
            id: self.id,
            business_id: self.business_id,
            name: self.name.clone(),
            store_id: self.store_id.clone(),
            integration_type: self.integration_type_id,
            config: self.config.clone(),
        }
    }

    pub fn to_simple(&self) -> IntegrationSimple {
        IntegrationSimple {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            integration_type_id: self.integration_type_id,
            business_id: self.business_id,
            is_active: self.is_active,
        }
    }
}

/// Insert payload for the store; ids and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIntegration {
    pub business_id: Option<BusinessId>,
    pub integration_type_id: IntegrationTypeId,
    pub code: String,
    pub name: String,
    pub store_id: Option<String>,
    pub config: JsonMap,
    pub credentials: Option<Vec<u8>>,
    pub is_active: bool,
    pub is_default: bool,
    pub is_testing: bool,
    pub created_by: Option<u64>,
}

/// Shape exposed to other subsystems. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicIntegration {
    pub id: IntegrationId,
    pub business_id: Option<BusinessId>,
    pub name: String,
    pub store_id: Option<String>,
    pub integration_type: IntegrationTypeId,
    pub config: JsonMap,
}

/// Minimal projection for dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSimple {
    pub id: IntegrationId,
    pub name: String,
    pub code: String,
    pub integration_type_id: IntegrationTypeId,
    pub business_id: Option<BusinessId>,
    pub is_active: bool,
}

/// Admin-only projection combining metadata and decrypted credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationWithCredentials {
    #[serde(flatten)]
    pub integration: Integration,
    pub credentials: CredentialMap,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateIntegrationRequest {
    pub name: String,
    pub code: String,
    pub integration_type_id: IntegrationTypeId,
    #[serde(default)]
    pub business_id: Option<BusinessId>,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub config: JsonMap,
    #[serde(default)]
    pub credentials: CredentialMap,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_testing: bool,
    #[serde(default)]
    pub created_by: Option<u64>,
}

/// Partial update. Absent fields are left untouched; present fields replace.
///
/// `updated_by == 0` means "do not stamp"; internal transitions such as
/// activate/deactivate use it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateIntegrationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub config: Option<JsonMap>,
    #[serde(default)]
    pub credentials: Option<CredentialMap>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub is_testing: Option<bool>,
    #[serde(default)]
    pub updated_by: u64,
}

impl UpdateIntegrationRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.store_id.is_none()
            && self.config.is_none()
            && self.credentials.is_none()
            && self.is_active.is_none()
            && self.is_default.is_none()
            && self.is_testing.is_none()
    }
}

/// In-line connection test used during onboarding, before a record exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestConnectionRequest {
    pub integration_type_id: IntegrationTypeId,
    #[serde(default)]
    pub config: JsonMap,
    #[serde(default)]
    pub credentials: CredentialMap,
}
