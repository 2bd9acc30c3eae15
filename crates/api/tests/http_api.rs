//! Router tests: envelope shape, status mapping and tenant scoping.

#[path = "support.rs"]
mod support;

use axum::http::{Method, StatusCode};
use integrahub_domain::constants::integration_types;
use serde_json::{json, Value};
use support::{TestApp, SUPER_ADMIN, TENANT_10, TENANT_20};

/// Registers WooCommerce through the API. No provider is registered for it,
/// so creating integrations of this type never leaves the process.
async fn seed_woocommerce(app: &TestApp) {
    let category = app.ecommerce_category().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/integration-types",
            SUPER_ADMIN,
            Some(json!({
                "id": integration_types::WOOCOMMERCE,
                "code": "woocommerce",
                "name": "WooCommerce",
                "category_id": category.id,
                "is_active": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

fn integration_body(code: &str) -> Value {
    json!({
        "name": format!("Store {code}"),
        "code": code,
        "integration_type_id": integration_types::WOOCOMMERCE,
        "config": { "store_url": "https://shop.example" },
        "credentials": { "access_token": "ck_live_123" }
    })
}

async fn create_for_tenant_10(app: &TestApp, code: &str) -> u64 {
    let (status, body) =
        app.call(Method::POST, "/integrations", TENANT_10, Some(integration_body(code))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_u64().expect("created id")
}

#[tokio::test]
async fn health_reports_ok_when_everything_runs() {
    let app = TestApp::spawn().await;

    let (status, body) = app.call(Method::GET, "/health", &[], None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["is_healthy"], true);
    let components = body["data"]["components"].as_array().expect("components");
    assert!(components.iter().any(|c| c["name"] == "database"));
    assert!(components.iter().any(|c| c["name"] == "broker"));

    app.ctx.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn requests_without_user_header_are_unauthorized() {
    let app = TestApp::spawn().await;

    let (status, body) = app.call(Method::GET, "/integrations", &[], None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("x-user-id"));

    let (status, _) =
        app.call(Method::GET, "/integrations", &[("x-user-id", "abc")], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_returns_envelope_without_credentials() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;

    let (status, body) = app
        .call(Method::POST, "/integrations", TENANT_10, Some(integration_body("woo-main")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Integration created");
    assert_eq!(body["data"]["business_id"], 10);
    assert_eq!(body["data"]["created_by"], 7);
    assert_eq!(body["data"]["code"], "woo-main");
    assert!(body["data"].get("credentials").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn duplicate_code_in_same_tenant_conflicts() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    create_for_tenant_10(&app, "woo-dup").await;

    let (status, body) = app
        .call(Method::POST, "/integrations", TENANT_10, Some(integration_body("woo-dup")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .call(Method::POST, "/integrations", TENANT_20, Some(integration_body("woo-dup")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_payloads_are_bad_requests() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;

    let mut body = integration_body("Bad Code!");
    body["name"] = json!("Broken");
    let (status, envelope) = app.call(Method::POST, "/integrations", TENANT_10, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["success"], false);

    let (status, _) = app
        .call(Method::POST, "/integrations", TENANT_10, Some(json!({ "name": "no code" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call(Method::GET, "/integrations/not-a-number", TENANT_10, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn super_admin_must_name_the_tenant_on_create() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;

    let (status, _) = app
        .call(Method::POST, "/integrations", SUPER_ADMIN, Some(integration_body("woo-admin")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = integration_body("woo-admin");
    body["business_id"] = json!(30);
    let (status, created) = app.call(Method::POST, "/integrations", SUPER_ADMIN, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["business_id"], 30);
}

#[tokio::test]
async fn other_tenants_cannot_read_or_modify() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    let id = create_for_tenant_10(&app, "woo-private").await;
    let uri = format!("/integrations/{id}");

    let (status, _) = app.call(Method::GET, &uri, TENANT_20, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, TENANT_20, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::GET, &uri, TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, _) = app.call(Method::GET, &uri, SUPER_ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_integration_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, body) = app.call(Method::GET, "/integrations/9999", TENANT_10, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Resource not found");
}

#[tokio::test]
async fn list_is_paginated_and_pinned_to_caller_tenant() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    for code in ["woo-a", "woo-b", "woo-c"] {
        create_for_tenant_10(&app, code).await;
    }
    let (status, _) = app
        .call(Method::POST, "/integrations", TENANT_20, Some(integration_body("woo-other")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // business_id in the query is ignored for tenant callers.
    let (status, body) = app
        .call(Method::GET, "/integrations?page=1&page_size=2&business_id=20", TENANT_10, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["page_size"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(2));

    let (status, body) = app.call(Method::GET, "/integrations/simple", TENANT_20, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("simple list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["code"], "woo-other");
}

#[tokio::test]
async fn lifecycle_transitions_and_delete() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    let id = create_for_tenant_10(&app, "woo-life").await;

    let (status, body) =
        app.call(Method::PUT, &format!("/integrations/{id}/deactivate"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, body) =
        app.call(Method::PUT, &format!("/integrations/{id}/activate"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], true);

    let (status, body) =
        app.call(Method::PUT, &format!("/integrations/{id}/set-default"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_default"], true);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/integrations/{id}"),
            TENANT_10,
            Some(json!({ "name": "Renamed store" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed store");
    assert_eq!(body["data"]["updated_by"], 7);

    let (status, body) =
        app.call(Method::GET, "/integrations/type/woocommerce", TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, body) = app.call(Method::DELETE, &format!("/integrations/{id}"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("data").is_none());

    let (status, _) = app.call(Method::GET, &format!("/integrations/{id}"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stored_connection_test_without_provider_checks_the_token() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    let id = create_for_tenant_10(&app, "woo-test").await;

    let (status, body) =
        app.call(Method::POST, &format!("/integrations/{id}/test"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Connection successful");

    let (status, _) = app
        .call(
            Method::POST,
            "/integrations/test",
            TENANT_10,
            Some(json!({
                "integration_type_id": integration_types::WOOCOMMERCE,
                "config": {},
                "credentials": {}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_routes_need_a_registered_provider() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    let id = create_for_tenant_10(&app, "woo-hook").await;

    let (status, body) =
        app.call(Method::GET, &format!("/integrations/{id}/webhook"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) =
        app.call(Method::GET, &format!("/integrations/{id}/webhooks"), TENANT_20, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn type_writes_need_super_admin() {
    let app = TestApp::spawn().await;
    let category = app.ecommerce_category().await;
    let body = json!({
        "code": "magento",
        "name": "Magento",
        "category_id": category.id,
        "is_active": true
    });

    let (status, _) =
        app.call(Method::POST, "/integration-types", TENANT_10, Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) =
        app.call(Method::POST, "/integration-types", SUPER_ADMIN, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let type_id = created["data"]["id"].as_u64().expect("type id");

    let (status, _) = app.call(Method::POST, "/integration-types", SUPER_ADMIN, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fetched) =
        app.call(Method::GET, "/integration-types/code/magento", TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["id"], type_id);

    let (status, _) =
        app.call(Method::DELETE, &format!("/integration-types/{type_id}"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        app.call(Method::DELETE, &format!("/integration-types/{type_id}"), SUPER_ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        app.call(Method::GET, &format!("/integration-types/{type_id}"), TENANT_10, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn type_with_integrations_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;
    create_for_tenant_10(&app, "woo-keep").await;

    let uri = format!("/integration-types/{}", integration_types::WOOCOMMERCE);
    let (status, body) = app.call(Method::DELETE, &uri, SUPER_ADMIN, None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn categories_and_active_types_are_listed() {
    let app = TestApp::spawn().await;
    seed_woocommerce(&app).await;

    let (status, body) = app.call(Method::GET, "/integration-categories", TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    let categories = body["data"].as_array().expect("categories");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["code"], "ecommerce");

    let (status, body) = app.call(Method::GET, "/integration-types/active", TENANT_10, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]
        .as_array()
        .expect("types")
        .iter()
        .any(|t| t["code"] == "woocommerce"));
}
