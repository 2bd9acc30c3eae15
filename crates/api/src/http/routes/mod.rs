pub mod catalog;
pub mod integrations;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::envelope::Envelope;
use crate::context::AppContext;

/// 200 when healthy, 503 otherwise; the report is returned either way.
pub async fn health(State(ctx): State<Arc<AppContext>>) -> Response {
    let report = ctx.health_check().await;
    let status = if report.is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = Envelope {
        success: report.is_healthy,
        message: if report.is_healthy { "healthy".into() } else { "degraded".into() },
        data: Some(report),
        error: None,
    };
    (status, Json(body)).into_response()
}
