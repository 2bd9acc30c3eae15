//! Shared harness for infra integration tests: an isolated SQLite file with
//! migrations applied, a fresh moka cache and services wired the way the
//! application wires them.

#![allow(dead_code)]

use std::sync::Arc;

use integrahub_core::{
    CredentialVault, IntegrationCache, IntegrationCategoryRepository, IntegrationRegistry,
    IntegrationRepository, IntegrationService, IntegrationTypeRepository, IntegrationTypeService,
};
use integrahub_domain::constants::{categories, integration_types};
use integrahub_domain::{
    CreateCategoryRequest, CreateIntegrationRequest, CreateIntegrationTypeRequest, CredentialMap,
    IntegrationTypeId, JsonMap,
};
use integrahub_infra::database::{
    DbManager, SqliteCategoryRepository, SqliteIntegrationRepository, SqliteTypeRepository,
};
use integrahub_infra::MokaIntegrationCache;
use serde_json::Value;
use tempfile::TempDir;

pub const TEST_KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

pub struct Harness {
    _temp_dir: TempDir,
    pub db: Arc<DbManager>,
    pub integrations: Arc<SqliteIntegrationRepository>,
    pub types: Arc<SqliteTypeRepository>,
    pub categories: Arc<SqliteCategoryRepository>,
    pub cache: Arc<MokaIntegrationCache>,
    pub service: Arc<IntegrationService>,
    pub type_service: IntegrationTypeService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_base_url(Some("https://hub.example".to_string()))
    }

    pub fn with_base_url(base_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("integrahub-test.db"), 4)
                .expect("database manager should initialise"),
        );
        db.run_migrations().expect("schema migrations should apply");

        let integrations = Arc::new(SqliteIntegrationRepository::new(Arc::clone(&db)));
        let types = Arc::new(SqliteTypeRepository::new(Arc::clone(&db)));
        let categories = Arc::new(SqliteCategoryRepository::new(Arc::clone(&db)));
        let cache = Arc::new(MokaIntegrationCache::new(1_000));
        let vault = CredentialVault::from_key(TEST_KEY).expect("vault");

        let service = IntegrationService::new(
            Arc::clone(&integrations) as Arc<dyn IntegrationRepository>,
            Arc::clone(&types) as Arc<dyn IntegrationTypeRepository>,
            Arc::clone(&cache) as Arc<dyn IntegrationCache>,
            vault.clone(),
            Arc::new(IntegrationRegistry::new()),
        )
        .with_webhook_base_url(base_url);

        let type_service = IntegrationTypeService::new(
            Arc::clone(&types) as Arc<dyn IntegrationTypeRepository>,
            Arc::clone(&categories) as Arc<dyn IntegrationCategoryRepository>,
            Arc::clone(&integrations) as Arc<dyn IntegrationRepository>,
            Arc::clone(&cache) as Arc<dyn IntegrationCache>,
            vault,
        );

        Self {
            _temp_dir: temp_dir,
            db,
            integrations,
            types,
            categories,
            cache,
            service: Arc::new(service),
            type_service,
        }
    }

    /// Seed the invoicing and ecommerce categories plus the Factus and
    /// Shopify types under their stable ids.
    pub async fn seed_catalog(&self, factus_base_url: Option<String>) {
        let invoicing = self
            .type_service
            .create_category(CreateCategoryRequest {
                code: categories::INVOICING.into(),
                name: "Invoicing".into(),
                display_order: 1,
                ..Default::default()
            })
            .await
            .expect("invoicing category");
        let ecommerce = self
            .type_service
            .create_category(CreateCategoryRequest {
                code: categories::ECOMMERCE.into(),
                name: "E-commerce".into(),
                display_order: 2,
                ..Default::default()
            })
            .await
            .expect("ecommerce category");

        self.type_service
            .create_integration_type(CreateIntegrationTypeRequest {
                id: Some(integration_types::FACTUS),
                code: "factus".into(),
                name: "Factus".into(),
                category_id: invoicing.id,
                is_active: true,
                base_url: factus_base_url.clone(),
                base_url_test: factus_base_url,
                ..Default::default()
            })
            .await
            .expect("factus type");
        self.type_service
            .create_integration_type(CreateIntegrationTypeRequest {
                id: Some(integration_types::SHOPIFY),
                code: "shopify".into(),
                name: "Shopify".into(),
                category_id: ecommerce.id,
                is_active: true,
                ..Default::default()
            })
            .await
            .expect("shopify type");
    }
}

pub fn map(value: Value) -> JsonMap {
    value.as_object().cloned().expect("json object")
}

pub fn create_request(
    type_id: IntegrationTypeId,
    code: &str,
    business_id: Option<u64>,
    credentials: CredentialMap,
) -> CreateIntegrationRequest {
    CreateIntegrationRequest {
        name: format!("Integration {code}"),
        code: code.to_string(),
        integration_type_id: type_id,
        business_id,
        credentials,
        is_active: true,
        ..Default::default()
    }
}
