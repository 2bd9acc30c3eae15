//! Values exchanged with provider implementations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JsonMap;
use crate::impl_wire_enum_conversions;

/// Where integrations of a type may live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTenancy {
    /// Global or per-tenant.
    #[default]
    Any,
    /// Tenant id must be null.
    GlobalOnly,
    /// Tenant id is required.
    TenantOnly,
}

impl_wire_enum_conversions!(ProviderTenancy {
    Any => "any",
    GlobalOnly => "global_only",
    TenantOnly => "tenant_only",
});

impl ProviderTenancy {
    pub const fn allows(self, business_id: Option<u64>) -> bool {
        match self {
            Self::Any => true,
            Self::GlobalOnly => business_id.is_none(),
            Self::TenantOnly => business_id.is_some(),
        }
    }
}

/// Informational description of the callback a provider subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub url: String,
    pub method: String,
    pub description: String,
    pub events: Vec<String>,
}

/// A webhook as reported by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWebhook {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
}

/// Optional parameters for order synchronization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub created_at_min: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at_max: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub extra: JsonMap,
}

/// Outcome of a bulk order sync for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: Vec<u64>,
    pub skipped: Vec<u64>,
    pub failed: Vec<u64>,
}

/// Outcome of a cache warm-up pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmCacheReport {
    pub metadata_cached: u64,
    pub credentials_cached: u64,
    pub errors: u64,
}
