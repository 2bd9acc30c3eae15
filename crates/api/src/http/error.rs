//! HTTP error mapping
//!
//! Every failure leaves the API as the standard envelope with
//! `success: false`. Server-side faults are reported with a generic message;
//! their details only reach the log.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use integrahub_domain::{ErrorClassification, HubError};
use tracing::{debug, error};

use super::envelope::Envelope;
use crate::utils::logging::error_label;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

pub type ApiResult<T = Response> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Hub(err) => hub_status(err),
        }
    }

    /// Text safe to return to the client.
    fn public_detail(&self) -> String {
        if self.status().is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

fn hub_status(err: &HubError) -> StatusCode {
    match err {
        HubError::Validation(_)
        | HubError::TestFailed(_)
        | HubError::AccessTokenNotFound(_)
        | HubError::ProviderUnregistered(_)
        | HubError::NotSupported(_) => StatusCode::BAD_REQUEST,
        HubError::Auth(_) => StatusCode::UNAUTHORIZED,
        HubError::NotFound(_) => StatusCode::NOT_FOUND,
        HubError::DuplicateCode(_) | HubError::HasIntegrations(_) | HubError::DeletionForbidden(_) => {
            StatusCode::CONFLICT
        }
        HubError::Config(_)
        | HubError::Crypto(_)
        | HubError::Store(_)
        | HubError::Cache(_)
        | HubError::Broker(_)
        | HubError::Network(_)
        | HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn summary(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Invalid request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Resource not found",
        StatusCode::CONFLICT => "Conflict",
        _ => "Internal server error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Hub(err) if status.is_server_error() => {
                error!(
                    kind = error_label(err),
                    severity = %err.severity(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "request failed"
                );
            }
            other => debug!(status = status.as_u16(), error = %other, "request rejected"),
        }

        let body = Envelope::<()>::failure(summary(status), self.public_detail());
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
