//! Per-provider request processor
//!
//! Consumes `invoicing.<provider>.requests` and publishes exactly one
//! response per well-formed request to `invoicing.responses`:
//!
//! 1. decode the request (malformed input is dead-lettered, not retried)
//! 2. resolve the integration
//! 3. decrypt tenant and platform credentials
//! 4. overlay the request config on the integration config
//! 5. call the vendor through the [`InvoiceIssuer`]
//! 6. build the response with the audit envelope
//! 7. stamp the wall-clock processing time

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use integrahub_domain::constants::{invoice_error_codes, INVOICING_RESPONSES_QUEUE};
use integrahub_domain::{CredentialMap, HubError, InvoiceRequest, InvoiceResponse, JsonMap};
use tracing::{error, info, instrument, warn};

use super::ports::{Disposition, InvoiceIssuer, IssueContext, MessageBroker, MessageHandler};
use super::queues::provider_requests_queue;
use crate::integrations::ports::IntegrationLookup;

pub struct InvoiceProcessor {
    broker: Arc<dyn MessageBroker>,
    lookup: Arc<dyn IntegrationLookup>,
    issuer: Arc<dyn InvoiceIssuer>,
    name: String,
}

impl InvoiceProcessor {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        lookup: Arc<dyn IntegrationLookup>,
        issuer: Arc<dyn InvoiceIssuer>,
    ) -> Self {
        let name = format!("invoicing-{}", issuer.provider());
        Self { broker, lookup, issuer, name }
    }

    /// Queue this processor consumes.
    pub fn queue(&self) -> String {
        provider_requests_queue(self.issuer.provider())
    }

    /// Turn one payload into its response. `None` for undecodable input.
    #[instrument(skip(self, payload), fields(provider = self.issuer.provider()))]
    pub async fn process(&self, payload: &[u8]) -> Option<InvoiceResponse> {
        let started = Instant::now();

        let request: InvoiceRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "malformed invoice request discarded");
                return None;
            }
        };

        let mut response = match self.build_context(&request).await {
            Ok(context) => {
                let outcome = self.issuer.issue(&context).await;
                let response = match outcome.result {
                    Ok(issued) => {
                        let mut response = InvoiceResponse::success_for(&request);
                        response.invoice_number = Some(issued.invoice_number);
                        response.external_id = issued.external_id;
                        response.issued_at = Some(issued.issued_at);
                        response
                    }
                    Err(failure) => {
                        InvoiceResponse::error_for(&request, &failure.error_code, failure.message)
                    }
                };
                response.with_audit(outcome.audit.as_ref())
            }
            Err(response) => *response,
        };
        response.processing_time_ms = elapsed_ms(started);

        if response.is_success() {
            info!(
                invoice_id = response.invoice_id,
                correlation_id = %response.correlation_id,
                invoice_number = ?response.invoice_number,
                processing_time_ms = response.processing_time_ms,
                "invoice issued"
            );
        } else {
            warn!(
                invoice_id = response.invoice_id,
                correlation_id = %response.correlation_id,
                error_code = ?response.error_code,
                error = ?response.error,
                "invoice not issued"
            );
        }
        Some(response)
    }

    /// Steps 2-4. An `Err` carries the finished error response.
    async fn build_context(
        &self,
        request: &InvoiceRequest,
    ) -> Result<IssueContext, Box<InvoiceResponse>> {
        let fail = |code: &str, message: String| {
            Box::new(InvoiceResponse::error_for(request, code, message))
        };

        if request.provider_key() != self.issuer.provider() {
            return Err(fail(
                invoice_error_codes::INVALID_REQUEST,
                format!("request for '{}' delivered to '{}'", request.provider, self.issuer.provider()),
            ));
        }

        let integration_id = request.invoice_data.integration_id;
        let integration = match self.lookup.integration(integration_id).await {
            Ok(integration) => integration,
            Err(HubError::NotFound(_)) => {
                return Err(fail(
                    invoice_error_codes::INTEGRATION_NOT_FOUND,
                    format!("integration {integration_id} not found"),
                ));
            }
            Err(err) => return Err(fail(invoice_error_codes::INTERNAL_ERROR, err.to_string())),
        };
        if !integration.is_active {
            return Err(fail(
                invoice_error_codes::INTEGRATION_INACTIVE,
                format!("integration {integration_id} is inactive"),
            ));
        }

        let mut credentials = match self.lookup.platform_credentials(integration.integration_type_id).await
        {
            Ok(platform) => platform,
            Err(HubError::NotFound(_)) => CredentialMap::new(),
            Err(err) => return Err(fail(credential_error_code(&err), err.to_string())),
        };
        match self.lookup.credentials(integration_id).await {
            Ok(tenant) => credentials.extend(tenant),
            Err(err) => return Err(fail(credential_error_code(&err), err.to_string())),
        }

        let missing: Vec<&str> = self
            .issuer
            .required_credentials()
            .iter()
            .copied()
            .filter(|field| !has_value(&credentials, field))
            .collect();
        if !missing.is_empty() {
            return Err(fail(
                invoice_error_codes::MISSING_CREDENTIALS,
                format!("missing credential fields: {}", missing.join(", ")),
            ));
        }

        let integration_type = self.lookup.integration_type(integration.integration_type_id).await.ok();
        let config = merge_config(&integration.config, &request.invoice_data.config);

        Ok(IssueContext {
            request: request.clone(),
            integration,
            integration_type,
            credentials,
            config,
        })
    }

    async fn publish(&self, response: &InvoiceResponse) -> Disposition {
        let body = match serde_json::to_vec(response) {
            Ok(body) => body,
            Err(err) => {
                error!(error = %err, "failed to encode invoice response");
                return Disposition::Reject { requeue: false };
            }
        };
        match self.broker.publish(INVOICING_RESPONSES_QUEUE, body).await {
            Ok(()) => Disposition::Ack,
            Err(err) => {
                error!(
                    correlation_id = %response.correlation_id,
                    error = %err,
                    "failed to publish invoice response"
                );
                Disposition::Reject { requeue: true }
            }
        }
    }
}

#[async_trait]
impl MessageHandler for InvoiceProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, payload: &[u8]) -> Disposition {
        match self.process(payload).await {
            Some(response) => self.publish(&response).await,
            None => Disposition::Reject { requeue: false },
        }
    }
}

fn credential_error_code(err: &HubError) -> &'static str {
    match err {
        HubError::Crypto(_) => invoice_error_codes::DECRYPTION_FAILED,
        HubError::NotFound(_) => invoice_error_codes::INTEGRATION_NOT_FOUND,
        _ => invoice_error_codes::INTERNAL_ERROR,
    }
}

fn has_value(credentials: &CredentialMap, field: &str) -> bool {
    match credentials.get(field) {
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(serde_json::Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Integration config overlaid with per-request keys.
pub fn merge_config(integration: &JsonMap, request: &JsonMap) -> JsonMap {
    let mut merged = integration.clone();
    merged.extend(request.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Whole milliseconds since `started`, rounded up and never zero.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    let micros = started.elapsed().as_micros();
    u64::try_from(micros.div_ceil(1000)).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_config_overrides_integration_config() {
        let integration = json!({ "numbering_range_id": 1, "document": "01" });
        let request = json!({ "numbering_range_id": 8 });

        let merged = merge_config(
            integration.as_object().unwrap(),
            request.as_object().unwrap(),
        );
        assert_eq!(merged["numbering_range_id"], 8);
        assert_eq!(merged["document"], "01");
    }

    #[test]
    fn elapsed_is_never_zero() {
        assert!(elapsed_ms(Instant::now()) >= 1);
    }

    #[test]
    fn crypto_failures_map_to_decryption_failed() {
        assert_eq!(
            credential_error_code(&HubError::Crypto("tag".into())),
            invoice_error_codes::DECRYPTION_FAILED
        );
        assert_eq!(
            credential_error_code(&HubError::Store("down".into())),
            invoice_error_codes::INTERNAL_ERROR
        );
    }
}
