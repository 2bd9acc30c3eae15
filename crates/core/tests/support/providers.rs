//! Scriptable provider and issuer doubles.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use integrahub_core::{IntegrationProvider, InvoiceIssuer, IssueContext, IssueFailure, IssueOutcome, IssuedInvoice};
use integrahub_domain::constants::invoice_error_codes;
use integrahub_domain::{
    AuditRecord, CredentialMap, HubError, IntegrationId, JsonMap, ProviderTenancy, RemoteWebhook,
    Result, SyncParams, WebhookInfo,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Provider whose answers are set up by the test. Every call is recorded.
pub struct MockProvider {
    name: String,
    reject_connection: AtomicBool,
    supports_sync: bool,
    supports_params: bool,
    supports_webhooks: bool,
    fail_sync: bool,
    tenancy: ProviderTenancy,
    deletable: bool,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reject_connection: AtomicBool::new(false),
            supports_sync: false,
            supports_params: false,
            supports_webhooks: false,
            fail_sync: false,
            tenancy: ProviderTenancy::Any,
            deletable: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(self) -> Self {
        self.reject_connection.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_sync(mut self) -> Self {
        self.supports_sync = true;
        self
    }

    pub fn with_params(mut self) -> Self {
        self.supports_params = true;
        self
    }

    pub fn with_webhooks(mut self) -> Self {
        self.supports_webhooks = true;
        self
    }

    pub fn failing_sync(mut self) -> Self {
        self.supports_sync = true;
        self.fail_sync = true;
        self
    }

    pub fn with_tenancy(mut self, tenancy: ProviderTenancy) -> Self {
        self.tenancy = tenancy;
        self
    }

    pub fn undeletable(mut self) -> Self {
        self.deletable = false;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl IntegrationProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tenancy(&self) -> ProviderTenancy {
        self.tenancy
    }

    fn allows_deletion(&self) -> bool {
        self.deletable
    }

    async fn test_connection(&self, _config: &JsonMap, credentials: &CredentialMap) -> Result<()> {
        self.record("test_connection");
        if self.reject_connection.load(Ordering::SeqCst) {
            return Err(HubError::Auth("invalid credentials".into()));
        }
        if credentials.is_empty() {
            return Err(HubError::TestFailed("no credentials".into()));
        }
        Ok(())
    }

    async fn sync_orders_by_integration_id(&self, id: IntegrationId) -> Result<()> {
        self.record(format!("sync:{id}"));
        if !self.supports_sync {
            return Err(HubError::not_supported("sync_orders_by_integration_id"));
        }
        if self.fail_sync {
            return Err(HubError::Network("vendor timeout".into()));
        }
        Ok(())
    }

    async fn sync_orders_by_integration_id_with_params(
        &self,
        id: IntegrationId,
        _params: &SyncParams,
    ) -> Result<()> {
        self.record(format!("sync_params:{id}"));
        if !self.supports_params {
            return Err(HubError::not_supported("sync_orders_by_integration_id_with_params"));
        }
        Ok(())
    }

    async fn get_webhook_url(&self, base_url: &str, id: IntegrationId) -> Result<WebhookInfo> {
        if !self.supports_webhooks {
            return Err(HubError::not_supported("get_webhook_url"));
        }
        Ok(WebhookInfo {
            url: format!("{base_url}/webhooks/{}/{id}", self.name),
            method: "POST".into(),
            description: "order events".into(),
            events: vec!["orders/create".into()],
        })
    }

    async fn create_webhook(&self, id: IntegrationId, base_url: &str) -> Result<Value> {
        self.record(format!("create_webhook:{id}:{base_url}"));
        if !self.supports_webhooks {
            return Err(HubError::not_supported("create_webhook"));
        }
        Ok(json!({ "created": 1 }))
    }

    async fn verify_webhooks_by_url(
        &self,
        id: IntegrationId,
        base_url: &str,
    ) -> Result<Vec<RemoteWebhook>> {
        if !self.supports_webhooks {
            return Err(HubError::not_supported("verify_webhooks_by_url"));
        }
        Ok(vec![RemoteWebhook {
            id: format!("wh-{id}"),
            url: format!("{base_url}/webhooks/{}/{id}", self.name),
            events: vec!["orders/create".into()],
        }])
    }
}

/// Issuer that succeeds unless the request total is negative.
pub struct MockIssuer {
    provider: String,
    pub seen: Mutex<Vec<IssueContext>>,
}

impl MockIssuer {
    pub fn new(provider: &str) -> Self {
        Self { provider: provider.to_string(), seen: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl InvoiceIssuer for MockIssuer {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn required_credentials(&self) -> &[&str] {
        &["client_id"]
    }

    async fn issue(&self, context: &IssueContext) -> IssueOutcome {
        self.seen.lock().push(context.clone());
        let audit = Some(AuditRecord {
            request_url: "https://vendor.test/v1/bills/validate".into(),
            request_payload: json!({ "reference_code": context.request.invoice_data.order_id })
                .to_string(),
            response_status: if context.request.invoice_data.total < 0.0 { 422 } else { 201 },
            response_body: "{\"status\":\"ok\"}".into(),
        });

        let result = if context.request.invoice_data.total < 0.0 {
            Err(IssueFailure::new(invoice_error_codes::PROVIDER_REJECTED, "negative total"))
        } else {
            Ok(IssuedInvoice {
                invoice_number: format!("SETP-{}", context.request.invoice_id),
                external_id: Some("ext-1".into()),
                issued_at: Utc::now(),
            })
        };
        IssueOutcome { result, audit }
    }
}
