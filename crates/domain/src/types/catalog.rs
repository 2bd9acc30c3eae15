//! Integration types and categories (the provider catalog)

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CredentialMap, IntegrationTypeId};

/// Taxonomy node such as "invoicing" or "ecommerce".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationCategory {
    pub id: u64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_category_id: Option<u64>,
    pub is_active: bool,
    pub is_visible: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A kind of provider. The numeric id is the canonical routing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationType {
    pub id: IntegrationTypeId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub category_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<IntegrationCategory>,
    pub is_active: bool,
    pub in_development: bool,
    pub config_schema: Option<Value>,
    pub credentials_schema: Option<Value>,
    pub base_url: Option<String>,
    pub base_url_test: Option<String>,
    /// Field-level ciphertext (base64 `nonce || ciphertext || tag` per value)
    /// of credentials owned by the platform rather than the tenant.
    #[serde(skip)]
    pub platform_credentials: Option<BTreeMap<String, String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationType {
    pub fn has_platform_credentials(&self) -> bool {
        self.platform_credentials.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Base URL for the requested environment, falling back to production.
    pub fn base_url_for(&self, is_testing: bool) -> Option<&str> {
        if is_testing {
            self.base_url_test.as_deref().or(self.base_url.as_deref())
        } else {
            self.base_url.as_deref()
        }
    }

    pub fn category_code(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.code.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateIntegrationTypeRequest {
    /// Stable routing id; assigned by the store when absent.
    #[serde(default)]
    pub id: Option<IntegrationTypeId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    pub category_id: u64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub in_development: bool,
    #[serde(default)]
    pub config_schema: Option<Value>,
    #[serde(default)]
    pub credentials_schema: Option<Value>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub base_url_test: Option<String>,
    /// Plaintext platform credentials; encrypted field by field on write.
    #[serde(default)]
    pub platform_credentials: Option<CredentialMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateIntegrationTypeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub in_development: Option<bool>,
    #[serde(default)]
    pub config_schema: Option<Value>,
    #[serde(default)]
    pub credentials_schema: Option<Value>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub base_url_test: Option<String>,
    #[serde(default)]
    pub platform_credentials: Option<CredentialMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationTypeFilters {
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_category_id: Option<u64>,
    #[serde(default)]
    pub is_visible: Option<bool>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_visible: Option<bool>,
    #[serde(default)]
    pub display_order: Option<i32>,
}
