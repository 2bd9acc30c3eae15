//! HTTP surface
//!
//! Integrations, integration types and categories behind the standard
//! `{ success, message, data?, error? }` envelope.

pub mod caller;
pub mod envelope;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use tracing::info;

pub use caller::Caller;
pub use envelope::Envelope;
pub use error::{ApiError, ApiResult};
use routes::{catalog, integrations};

use crate::context::AppContext;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/integrations", get(integrations::list).post(integrations::create))
        .route("/integrations/simple", get(integrations::list_simple))
        .route("/integrations/test", post(integrations::test_raw))
        .route("/integrations/type/{type_code}", get(integrations::get_by_type))
        .route(
            "/integrations/{id}",
            get(integrations::get).put(integrations::update).delete(integrations::delete),
        )
        .route("/integrations/{id}/test", post(integrations::test_stored))
        .route("/integrations/{id}/activate", put(integrations::activate))
        .route("/integrations/{id}/deactivate", put(integrations::deactivate))
        .route("/integrations/{id}/set-default", put(integrations::set_default))
        .route("/integrations/{id}/webhook", get(integrations::webhook_url))
        .route("/integrations/{id}/webhooks", get(integrations::list_webhooks))
        .route("/integrations/{id}/webhooks/verify", get(integrations::verify_webhooks))
        .route("/integrations/{id}/webhooks/create", post(integrations::create_webhook))
        .route(
            "/integrations/{id}/webhooks/{webhook_id}",
            axum::routing::delete(integrations::delete_webhook),
        )
        .route("/integration-types", get(catalog::list_types).post(catalog::create_type))
        .route("/integration-types/active", get(catalog::list_active_types))
        .route("/integration-types/code/{code}", get(catalog::get_type_by_code))
        .route(
            "/integration-types/{id}",
            get(catalog::get_type).put(catalog::update_type).delete(catalog::delete_type),
        )
        .route("/integration-categories", get(catalog::list_categories))
        .layer(middleware::from_fn(log_request))
        .with_state(ctx)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "http request"
    );
    response
}
