//! Shared test helpers for `integrahub-core` integration tests.
//!
//! In-memory stand-ins for the store, cache and broker ports plus scriptable
//! providers, so the service tests can focus on behaviour.

#![allow(dead_code)]

pub mod broker;
pub mod cache;
pub mod providers;
pub mod repositories;

use std::sync::Arc;

use chrono::Utc;
use integrahub_core::{
    CredentialVault, IntegrationCache, IntegrationRegistry, IntegrationRepository,
    IntegrationService, IntegrationTypeRepository,
};
use integrahub_domain::constants::integration_types::{FACTUS, SHOPIFY};
use integrahub_domain::{
    BusinessId, CreateIntegrationRequest, CredentialMap, Integration, IntegrationCategory,
    IntegrationId, IntegrationType, IntegrationTypeId, JsonMap,
};
use serde_json::json;

use self::cache::MemoryCache;
use self::repositories::{MemoryIntegrationRepository, MemoryTypeRepository};

pub const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

pub fn vault() -> CredentialVault {
    CredentialVault::from_key(KEY).expect("32-byte key")
}

pub fn category(id: u64, code: &str) -> IntegrationCategory {
    let now = Utc::now();
    IntegrationCategory {
        id,
        code: code.to_string(),
        name: code.to_uppercase(),
        description: None,
        parent_category_id: None,
        is_active: true,
        is_visible: true,
        display_order: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn integration_type(id: u64, code: &str, category_id: u64) -> IntegrationType {
    let now = Utc::now();
    IntegrationType {
        id,
        code: code.to_string(),
        name: code.to_string(),
        description: None,
        icon_url: None,
        category_id,
        category: Some(category(category_id, "invoicing")),
        is_active: true,
        in_development: false,
        config_schema: None,
        credentials_schema: None,
        base_url: Some(format!("https://api.{code}.test")),
        base_url_test: Some(format!("https://sandbox.{code}.test")),
        platform_credentials: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn factus_type() -> IntegrationType {
    integration_type(FACTUS, "factus", 3)
}

pub fn shopify_type() -> IntegrationType {
    let mut ty = integration_type(SHOPIFY, "shopify", 1);
    ty.category = Some(category(1, "ecommerce"));
    ty
}

pub fn credentials(value: serde_json::Value) -> CredentialMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("credentials fixture must be an object, got {other}"),
    }
}

/// Create request for a Factus integration of tenant 1.
pub fn factus_request(code: &str) -> CreateIntegrationRequest {
    CreateIntegrationRequest {
        name: "Factus Prod".into(),
        code: code.to_string(),
        integration_type_id: FACTUS,
        business_id: Some(1),
        store_id: None,
        config: JsonMap::new(),
        credentials: credentials(json!({
            "client_id": "client",
            "client_secret": "secret",
            "username": "billing@example.com",
            "password": "hunter2"
        })),
        is_active: true,
        is_default: false,
        is_testing: false,
        created_by: Some(3),
    }
}

/// Store row as the repository would return it, credentials unset.
pub fn stored(
    id: IntegrationId,
    type_id: IntegrationTypeId,
    business_id: Option<BusinessId>,
) -> Integration {
    let now = Utc::now();
    Integration {
        id,
        business_id,
        integration_type_id: type_id,
        integration_type: None,
        code: format!("integration_{id}"),
        name: format!("Integration {id}"),
        store_id: None,
        config: JsonMap::new(),
        credentials: None,
        is_active: true,
        is_default: false,
        is_testing: false,
        last_sync_at: None,
        created_by: None,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

pub struct Harness {
    pub service: IntegrationService,
    pub integrations: Arc<MemoryIntegrationRepository>,
    pub types: Arc<MemoryTypeRepository>,
    pub cache: Arc<MemoryCache>,
    pub registry: Arc<IntegrationRegistry>,
}

pub fn harness() -> Harness {
    harness_with(|service| service)
}

/// Build a harness seeded with the Factus and Shopify types, letting the
/// caller tweak the service before it is frozen.
pub fn harness_with(configure: impl FnOnce(IntegrationService) -> IntegrationService) -> Harness {
    let integrations = Arc::new(MemoryIntegrationRepository::new());
    let types = Arc::new(MemoryTypeRepository::with_types([factus_type(), shopify_type()]));
    let cache = Arc::new(MemoryCache::new());
    let registry = Arc::new(IntegrationRegistry::new());

    let service = IntegrationService::new(
        Arc::clone(&integrations) as Arc<dyn IntegrationRepository>,
        Arc::clone(&types) as Arc<dyn IntegrationTypeRepository>,
        Arc::clone(&cache) as Arc<dyn IntegrationCache>,
        vault(),
        Arc::clone(&registry),
    );

    Harness { service: configure(service), integrations, types, cache, registry }
}
