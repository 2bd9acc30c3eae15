//! Broker and issuer ports for the invoicing fabric

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use integrahub_domain::{
    AuditRecord, CredentialMap, Integration, IntegrationType, InvoiceRequest, InvoiceResponse,
    JsonMap, Result,
};

/// One message handed to a consumer. The tag identifies it for ack/reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: u64,
    pub payload: Vec<u8>,
    pub redelivered: bool,
}

/// Durable named queues with explicit acknowledgement.
///
/// A delivered message is held by exactly one consumer until it is acked
/// or rejected.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Idempotent.
    async fn declare_queue(&self, queue: &str) -> Result<()>;

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()>;

    /// Wait for the next message. `None` once the broker is closed.
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>>;

    async fn ack(&self, queue: &str, tag: u64) -> Result<()>;

    /// Return the message to the queue (`requeue`) or dead-letter it.
    async fn reject(&self, queue: &str, tag: u64, requeue: bool) -> Result<()>;
}

/// What a consumer wants done with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Reject { requeue: bool },
}

/// Per-message consumer logic, driven by a queue worker.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, payload: &[u8]) -> Disposition;
}

/// Everything a provider needs to issue one invoice.
#[derive(Debug, Clone)]
pub struct IssueContext {
    pub request: InvoiceRequest,
    pub integration: Integration,
    pub integration_type: Option<IntegrationType>,
    /// Platform credentials overlaid with the tenant's.
    pub credentials: CredentialMap,
    /// Integration config overlaid with the request config.
    pub config: JsonMap,
}

impl IssueContext {
    /// String credential field, if present.
    pub fn credential(&self, field: &str) -> Option<&str> {
        self.credentials.get(field).and_then(|v| v.as_str())
    }

    /// Vendor base URL for the integration's environment.
    pub fn base_url(&self) -> Option<&str> {
        self.config.get("base_url").and_then(|v| v.as_str()).or_else(|| {
            self.integration_type
                .as_ref()
                .and_then(|t| t.base_url_for(self.integration.is_testing))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvoice {
    pub invoice_number: String,
    pub external_id: Option<String>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFailure {
    pub error_code: String,
    pub message: String,
}

impl IssueFailure {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self { error_code: error_code.to_string(), message: message.into() }
    }
}

/// Result of a vendor call plus the last captured HTTP exchange.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub result: std::result::Result<IssuedInvoice, IssueFailure>,
    pub audit: Option<AuditRecord>,
}

/// Vendor side of a provider queue consumer.
#[async_trait]
pub trait InvoiceIssuer: Send + Sync {
    /// Lowercase provider key, as used in queue names.
    fn provider(&self) -> &str;

    /// Credential fields that must be present before calling the vendor.
    fn required_credentials(&self) -> &[&str] {
        &[]
    }

    async fn issue(&self, context: &IssueContext) -> IssueOutcome;
}

/// Business-layer sink for invoice responses.
#[async_trait]
pub trait InvoiceResponseHandler: Send + Sync {
    async fn on_response(&self, response: InvoiceResponse) -> Result<()>;
}
