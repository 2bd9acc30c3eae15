//! Application constants
//!
//! Centralized location for the stable identifiers shared by every layer:
//! integration type ids (routing keys), queue names, cache keyspace and
//! environment variable names.

use std::time::Duration;

/// Stable numeric integration type ids.
///
/// These ids are the routing contract between the registry, the store and
/// the message fabric. Codes are display/lookup concerns only.
pub mod integration_types {
    pub const SHOPIFY: u64 = 1;
    pub const WHATSAPP: u64 = 2;
    pub const MERCADO_LIBRE: u64 = 3;
    pub const WOOCOMMERCE: u64 = 4;
    pub const ALEGRA: u64 = 5;
    pub const SIIGO: u64 = 6;
    pub const FACTUS: u64 = 7;
}

/// Category codes seeded by operators.
pub mod categories {
    pub const ECOMMERCE: &str = "ecommerce";
    pub const MESSAGING: &str = "messaging";
    pub const INVOICING: &str = "invoicing";
    pub const MARKETPLACE: &str = "marketplace";
}

// Message fabric
pub const INVOICING_REQUESTS_QUEUE: &str = "invoicing.requests";
pub const INVOICING_RESPONSES_QUEUE: &str = "invoicing.responses";
pub const INVOICING_QUEUE_PREFIX: &str = "invoicing";
pub const INVOICING_QUEUE_SUFFIX: &str = "requests";

/// Machine-readable `error_code` values emitted on invoice responses.
pub mod invoice_error_codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const UNKNOWN_PROVIDER: &str = "unknown_provider";
    pub const INTEGRATION_NOT_FOUND: &str = "integration_not_found";
    pub const INTEGRATION_INACTIVE: &str = "integration_inactive";
    pub const DECRYPTION_FAILED: &str = "decryption_failed";
    pub const MISSING_CREDENTIALS: &str = "missing_credentials";
    pub const AUTHENTICATION_FAILED: &str = "authentication_failed";
    pub const PROVIDER_REJECTED: &str = "provider_rejected";
    pub const PROVIDER_UNAVAILABLE: &str = "provider_unavailable";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

// Cache keyspace
pub const CACHE_KEY_PREFIX: &str = "integration";
pub const METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const CREDENTIALS_TTL: Duration = Duration::from_secs(60 * 60);
pub const PLATFORM_CREDENTIALS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const INDEX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// Pagination
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const WARM_CACHE_PAGE_SIZE: u32 = 1000;
pub const SIMPLE_LIST_LIMIT: u32 = 1000;

// Provider HTTP
pub const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// Credential field names with structural meaning
pub const ACCESS_TOKEN_FIELD: &str = "access_token";

// Environment variables
pub const ENV_ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";
pub const ENV_WEBHOOK_BASE_URL: &str = "WEBHOOK_BASE_URL";
pub const ENV_URL_BASE_SWAGGER: &str = "URL_BASE_SWAGGER";
