//! Caller identity and tenant scoping
//!
//! Authentication happens upstream; the gateway forwards the verified
//! identity in headers. A caller without `x-user-id` is rejected with 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use integrahub_domain::{BusinessId, Integration};

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const BUSINESS_ID_HEADER: &str = "x-business-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: u64,
    pub business_id: Option<BusinessId>,
    pub is_super_admin: bool,
}

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id = numeric_header(headers, USER_ID_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        let business_id = numeric_header(headers, BUSINESS_ID_HEADER)?;
        let is_super_admin = headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(SUPER_ADMIN_ROLE));

        Ok(Self { user_id, business_id, is_super_admin })
    }

    /// Tenant a query runs against. Super-admins pick freely; everyone else
    /// is pinned to their own business.
    pub fn scope(&self, requested: Option<BusinessId>) -> Result<Option<BusinessId>, ApiError> {
        if self.is_super_admin {
            return Ok(requested);
        }
        self.own_business().map(Some)
    }

    /// Tenant for a new integration.
    pub fn tenant_for_create(&self, requested: Option<BusinessId>) -> Result<BusinessId, ApiError> {
        if self.is_super_admin {
            return requested
                .ok_or_else(|| ApiError::BadRequest("business_id is required for super-admin callers".into()));
        }
        self.own_business()
    }

    /// Global integrations are readable by every tenant.
    pub fn ensure_can_read(&self, integration: &Integration) -> Result<(), ApiError> {
        match integration.business_id {
            None => Ok(()),
            Some(_) => self.ensure_can_write(integration),
        }
    }

    /// Global integrations are only writable by super-admins.
    pub fn ensure_can_write(&self, integration: &Integration) -> Result<(), ApiError> {
        if self.is_super_admin {
            return Ok(());
        }
        match (integration.business_id, self.business_id) {
            (Some(owner), Some(own)) if owner == own => Ok(()),
            _ => Err(ApiError::Forbidden(format!(
                "integration {} belongs to another tenant",
                integration.id
            ))),
        }
    }

    pub fn require_super_admin(&self) -> Result<(), ApiError> {
        if self.is_super_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("super-admin role required".into()))
        }
    }

    fn own_business(&self) -> Result<BusinessId, ApiError> {
        self.business_id
            .ok_or_else(|| ApiError::Forbidden(format!("missing {BUSINESS_ID_HEADER} header")))
    }
}

fn numeric_header(headers: &HeaderMap, name: &str) -> Result<Option<u64>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("{name} must be a positive integer")))
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
