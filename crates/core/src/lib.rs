//! # IntegraHub Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (store, cache, broker, provider contract)
//! - The integration registry, credential vault and observer list
//! - Use cases: `IntegrationService`, `IntegrationTypeService`
//! - The asynchronous invoicing fabric (router, provider processor,
//!   request publisher, response consumer)
//!
//! ## Architecture Principles
//! - Only depends on `integrahub-common` and `integrahub-domain`
//! - No database, HTTP, or broker driver code
//! - All external dependencies via traits

#[cfg(panic = "abort")]
compile_error!("observer and queue worker isolation rely on catch_unwind; build with panic = \"unwind\"");

pub mod integrations;
pub mod invoicing;

// Re-export specific items to avoid ambiguity
pub use integrations::observers::{observer_fn, IntegrationObserver, WebhookAutoRegistration};
pub use integrations::ports::{
    CacheLookup, CachedCredentials, IntegrationCache, IntegrationCategoryRepository,
    IntegrationLookup, IntegrationRepository, IntegrationTypeRepository,
};
pub use integrations::provider::IntegrationProvider;
pub use integrations::registry::IntegrationRegistry;
pub use integrations::resolver::IntegrationResolver;
pub use integrations::service::IntegrationService;
pub use integrations::type_service::IntegrationTypeService;
pub use integrations::vault::CredentialVault;
pub use invoicing::ports::{
    Delivery, Disposition, InvoiceIssuer, InvoiceResponseHandler, IssueContext, IssueFailure,
    IssueOutcome, IssuedInvoice, MessageBroker, MessageHandler,
};
pub use invoicing::processor::InvoiceProcessor;
pub use invoicing::publisher::InvoiceRequestPublisher;
pub use invoicing::responses::InvoiceResponseConsumer;
pub use invoicing::router::InvoicingRouter;
