//! Integration type and category catalog.

mod support;

use std::sync::Arc;

use integrahub_core::integrations::cache_keys;
use integrahub_core::{
    IntegrationCache, IntegrationCategoryRepository, IntegrationRepository,
    IntegrationTypeRepository, IntegrationTypeService,
};
use integrahub_domain::constants::integration_types::FACTUS;
use integrahub_domain::{
    CreateCategoryRequest, CreateIntegrationTypeRequest, HubError, IntegrationTypeFilters,
    UpdateCategoryRequest, UpdateIntegrationTypeRequest,
};
use serde_json::json;
use support::cache::MemoryCache;
use support::repositories::{
    MemoryCategoryRepository, MemoryIntegrationRepository, MemoryTypeRepository,
};
use support::{category, credentials, factus_type, stored, vault};

struct Catalog {
    service: IntegrationTypeService,
    types: Arc<MemoryTypeRepository>,
    integrations: Arc<MemoryIntegrationRepository>,
    cache: Arc<MemoryCache>,
}

fn catalog() -> Catalog {
    let types = Arc::new(MemoryTypeRepository::with_types([factus_type()]));
    let categories = Arc::new(MemoryCategoryRepository::with_categories([
        category(1, "ecommerce"),
        category(3, "invoicing"),
    ]));
    let integrations = Arc::new(MemoryIntegrationRepository::new());
    let cache = Arc::new(MemoryCache::new());

    let service = IntegrationTypeService::new(
        Arc::clone(&types) as Arc<dyn IntegrationTypeRepository>,
        categories as Arc<dyn IntegrationCategoryRepository>,
        Arc::clone(&integrations) as Arc<dyn IntegrationRepository>,
        Arc::clone(&cache) as Arc<dyn IntegrationCache>,
        vault(),
    );
    Catalog { service, types, integrations, cache }
}

fn siigo_request() -> CreateIntegrationTypeRequest {
    CreateIntegrationTypeRequest {
        id: Some(6),
        code: "siigo".into(),
        name: "Siigo".into(),
        category_id: 3,
        is_active: true,
        platform_credentials: Some(credentials(json!({ "partner_id": "integrahub" }))),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_type_keeps_requested_id_and_seals_platform_credentials() {
    let c = catalog();
    let created = c.service.create_integration_type(siigo_request()).await.unwrap();

    assert_eq!(created.id, 6);
    assert_eq!(created.category_code(), Some("invoicing"));
    let sealed = created.platform_credentials.as_ref().unwrap();
    assert_ne!(sealed["partner_id"], "integrahub");
    assert_eq!(vault().decrypt_value(&sealed["partner_id"]).unwrap(), "integrahub");

    let platform = c.service.get_platform_credentials(6).await.unwrap();
    assert_eq!(platform["partner_id"], "integrahub");
    assert!(c.cache.contains(&cache_keys::platform_creds_key(6)));
}

#[tokio::test]
async fn create_type_validates_category_and_code() {
    let c = catalog();

    let err = c
        .service
        .create_integration_type(CreateIntegrationTypeRequest { category_id: 42, ..siigo_request() })
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Validation(_)), "{err}");

    let err = c
        .service
        .create_integration_type(CreateIntegrationTypeRequest {
            code: "factus".into(),
            ..siigo_request()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::DuplicateCode(_)), "{err}");

    let err = c
        .service
        .create_integration_type(CreateIntegrationTypeRequest {
            code: "Bad Code".into(),
            ..siigo_request()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Validation(_)), "{err}");
}

#[tokio::test]
async fn update_type_invalidates_dependent_cache_entries() {
    let c = catalog();
    c.integrations.insert_row(stored(11, FACTUS, Some(1)));
    c.cache.set_integration(&stored(11, FACTUS, Some(1))).await.unwrap();
    c.cache
        .set_platform_credentials(FACTUS, &credentials(json!({ "client_id": "old" })))
        .await
        .unwrap();

    let updated = c
        .service
        .update_integration_type(
            FACTUS,
            UpdateIntegrationTypeRequest {
                name: Some("Factus DIAN".into()),
                platform_credentials: Some(credentials(json!({ "client_id": "new" }))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Factus DIAN");
    assert!(!c.cache.contains(&cache_keys::meta_key(11)));
    assert!(!c.cache.contains(&cache_keys::platform_creds_key(FACTUS)));
    assert_eq!(c.service.get_platform_credentials(FACTUS).await.unwrap()["client_id"], "new");
}

#[tokio::test]
async fn delete_type_refused_while_active_integrations_exist() {
    let c = catalog();
    c.integrations.insert_row(stored(11, FACTUS, Some(1)));

    let err = c.service.delete_integration_type(FACTUS).await.unwrap_err();
    assert!(matches!(err, HubError::HasIntegrations(_)), "{err}");
    assert!(!c.types.is_deleted(FACTUS));
}

#[tokio::test]
async fn delete_type_is_soft() {
    let c = catalog();
    let mut inactive = stored(11, FACTUS, Some(1));
    inactive.is_active = false;
    c.integrations.insert_row(inactive);

    c.service.delete_integration_type(FACTUS).await.unwrap();

    assert!(c.types.is_deleted(FACTUS));
    assert!(c.service.get_integration_type_by_id(FACTUS).await.unwrap_err().is_not_found());
    assert!(c.service.list_integration_types(&IntegrationTypeFilters::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn active_type_listing_skips_inactive_types() {
    let c = catalog();
    c.service
        .create_integration_type(CreateIntegrationTypeRequest { is_active: false, ..siigo_request() })
        .await
        .unwrap();

    let active = c.service.list_active_integration_types().await.unwrap();
    assert_eq!(active.iter().map(|t| t.code.as_str()).collect::<Vec<_>>(), ["factus"]);
    assert_eq!(c.service.get_integration_type_by_code("siigo").await.unwrap().id, 6);
}

#[tokio::test]
async fn categories_are_unique_and_ordered() {
    let c = catalog();
    let created = c
        .service
        .create_category(CreateCategoryRequest {
            code: "messaging".into(),
            name: "Messaging".into(),
            display_order: -1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(created.is_visible);

    let err = c
        .service
        .create_category(CreateCategoryRequest {
            code: "messaging".into(),
            name: "Again".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::DuplicateCode(_)), "{err}");

    let err = c
        .service
        .create_category(CreateCategoryRequest {
            code: "chat".into(),
            name: "Chat".into(),
            parent_category_id: Some(99),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Validation(_)), "{err}");

    c.service
        .update_category(1, UpdateCategoryRequest { is_visible: Some(false), ..Default::default() })
        .await
        .unwrap();
    let visible = c.service.list_active_categories().await.unwrap();
    assert_eq!(visible.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(), ["messaging", "invoicing"]);
    assert_eq!(c.service.list_categories().await.unwrap().len(), 3);
}
