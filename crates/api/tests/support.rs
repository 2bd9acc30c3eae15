//! Shared harness for API tests: a full application context on a temporary
//! SQLite file, driven through the router with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use integrahub_api::{router, AppContext};
use integrahub_domain::constants::categories;
use integrahub_domain::{
    CacheConfig, CreateCategoryRequest, DatabaseConfig, HubConfig, IntegrationCategory,
    SecurityConfig, WebhookConfig,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

pub fn test_config(dir: &TempDir) -> HubConfig {
    HubConfig {
        security: SecurityConfig { encryption_key: TEST_KEY.to_string() },
        webhooks: WebhookConfig {
            base_url: Some("https://hub.example".into()),
            swagger_base_url: None,
        },
        database: DatabaseConfig {
            path: dir.path().join("integrahub-api.db").to_string_lossy().into_owned(),
            pool_size: 4,
        },
        cache: CacheConfig { max_capacity: 1_000 },
        ..Default::default()
    }
}

pub struct TestApp {
    _temp_dir: TempDir,
    pub ctx: Arc<AppContext>,
    pub app: Router,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let ctx = Arc::new(
            AppContext::new(test_config(&temp_dir)).await.expect("context should start"),
        );
        let app = router(Arc::clone(&ctx));
        Self { _temp_dir: temp_dir, ctx, app }
    }

    pub async fn ecommerce_category(&self) -> IntegrationCategory {
        self.ctx
            .types
            .create_category(CreateCategoryRequest {
                code: categories::ECOMMERCE.into(),
                name: "E-commerce".into(),
                display_order: 1,
                ..Default::default()
            })
            .await
            .expect("ecommerce category")
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.app.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }
}

pub const SUPER_ADMIN: &[(&str, &str)] = &[("x-user-id", "1"), ("x-user-role", "super_admin")];
pub const TENANT_10: &[(&str, &str)] = &[("x-user-id", "7"), ("x-business-id", "10")];
pub const TENANT_20: &[(&str, &str)] = &[("x-user-id", "8"), ("x-business-id", "20")];
