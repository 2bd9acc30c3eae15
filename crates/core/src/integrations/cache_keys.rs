//! Cache keyspace
//!
//! | Purpose | Key | TTL |
//! |---|---|---|
//! | Integration metadata | `integration:meta:<id>` | 24 h |
//! | Plaintext credentials | `integration:creds:<id>` | 1 h |
//! | Platform credentials | `integration:platform_creds:<type_id>` | 24 h |
//! | Code index | `integration:code:<code>` | 24 h |
//! | Tenant/type index | `integration:idx:biz:<tenant>:type:<type>` | 24 h |
//!
//! Global integrations (no tenant) use `global` in the tenant slot.

use std::time::Duration;

use integrahub_domain::constants::{
    CACHE_KEY_PREFIX, CREDENTIALS_TTL, INDEX_TTL, METADATA_TTL, PLATFORM_CREDENTIALS_TTL,
};
use integrahub_domain::{BusinessId, IntegrationId, IntegrationTypeId};

const GLOBAL_TENANT: &str = "global";

pub fn meta_key(id: IntegrationId) -> String {
    format!("{CACHE_KEY_PREFIX}:meta:{id}")
}

pub fn creds_key(id: IntegrationId) -> String {
    format!("{CACHE_KEY_PREFIX}:creds:{id}")
}

pub fn platform_creds_key(type_id: IntegrationTypeId) -> String {
    format!("{CACHE_KEY_PREFIX}:platform_creds:{type_id}")
}

pub fn code_key(code: &str) -> String {
    format!("{CACHE_KEY_PREFIX}:code:{code}")
}

pub fn business_type_key(business_id: Option<BusinessId>, type_id: IntegrationTypeId) -> String {
    match business_id {
        Some(business_id) => format!("{CACHE_KEY_PREFIX}:idx:biz:{business_id}:type:{type_id}"),
        None => format!("{CACHE_KEY_PREFIX}:idx:biz:{GLOBAL_TENANT}:type:{type_id}"),
    }
}

/// TTL for a key, derived from its segment.
pub fn ttl_for(key: &str) -> Duration {
    let rest = key.strip_prefix(CACHE_KEY_PREFIX).unwrap_or(key);
    if rest.starts_with(":creds:") {
        CREDENTIALS_TTL
    } else if rest.starts_with(":platform_creds:") {
        PLATFORM_CREDENTIALS_TTL
    } else if rest.starts_with(":meta:") {
        METADATA_TTL
    } else {
        INDEX_TTL
    }
}
