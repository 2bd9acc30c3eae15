//! Domain types and models

pub mod catalog;
pub mod filters;
pub mod integration;
pub mod invoicing;
pub mod provider;

pub use catalog::{
    CreateCategoryRequest, CreateIntegrationTypeRequest, IntegrationCategory, IntegrationType,
    IntegrationTypeFilters, UpdateCategoryRequest, UpdateIntegrationTypeRequest,
};
pub use filters::{clamp_page, clamp_page_size, IntegrationFilters, Page};
pub use integration::{
    CreateIntegrationRequest, Integration, IntegrationSimple, IntegrationWithCredentials,
    NewIntegration, PublicIntegration, TestConnectionRequest, UpdateIntegrationRequest,
};
pub use invoicing::{
    AuditRecord, InvoiceCustomer, InvoiceData, InvoiceItem, InvoiceOperation, InvoiceRequest,
    InvoiceResponse, InvoiceStatus,
};
pub use provider::{
    ProviderTenancy, RemoteWebhook, SyncParams, SyncReport, WarmCacheReport, WebhookInfo,
};

/// Integration record id.
pub type IntegrationId = u64;

/// Stable numeric integration type id (the routing key).
pub type IntegrationTypeId = u64;

/// Tenant (business) id.
pub type BusinessId = u64;

/// Free-form JSON object used for config blobs.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Plaintext credential mapping. Exists only transiently in memory or in the
/// credentials cache; never persisted in this form.
pub type CredentialMap = serde_json::Map<String, serde_json::Value>;
