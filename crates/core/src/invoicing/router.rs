//! Central request router: `invoicing.requests` to one provider queue.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use integrahub_domain::constants::{invoice_error_codes, INVOICING_RESPONSES_QUEUE};
use integrahub_domain::{InvoiceRequest, InvoiceResponse};
use tracing::{debug, error, warn};

use super::ports::{Disposition, MessageBroker, MessageHandler};
use super::processor::elapsed_ms;
use super::queues::provider_requests_queue;

/// Pure routing: the payload is forwarded untouched, so correlation and
/// invoice ids survive byte for byte.
pub struct InvoicingRouter {
    broker: Arc<dyn MessageBroker>,
    providers: BTreeSet<String>,
}

impl InvoicingRouter {
    pub fn new<I, S>(broker: Arc<dyn MessageBroker>, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let providers = providers
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { broker, providers }
    }

    pub fn knows(&self, provider: &str) -> bool {
        self.providers.contains(&provider.trim().to_lowercase())
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(String::as_str)
    }

    pub async fn route(&self, payload: &[u8]) -> Disposition {
        let started = Instant::now();
        let request: InvoiceRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "malformed invoice request discarded");
                return Disposition::Reject { requeue: false };
            }
        };

        let provider = request.provider_key();
        if !self.providers.contains(&provider) {
            warn!(
                invoice_id = request.invoice_id,
                correlation_id = %request.correlation_id,
                provider = %request.provider,
                "unknown invoicing provider"
            );
            let mut response = InvoiceResponse::error_for(
                &request,
                invoice_error_codes::UNKNOWN_PROVIDER,
                format!("unknown invoicing provider '{}'", request.provider),
            );
            response.processing_time_ms = elapsed_ms(started);
            return self.publish_response(&response).await;
        }

        let queue = provider_requests_queue(&provider);
        match self.broker.publish(&queue, payload.to_vec()).await {
            Ok(()) => {
                debug!(
                    invoice_id = request.invoice_id,
                    correlation_id = %request.correlation_id,
                    queue = %queue,
                    "invoice request routed"
                );
                Disposition::Ack
            }
            Err(err) => {
                error!(queue = %queue, error = %err, "failed to forward invoice request");
                Disposition::Reject { requeue: true }
            }
        }
    }

    async fn publish_response(&self, response: &InvoiceResponse) -> Disposition {
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
                error!(error = %err, "failed to publish invoice response");
                Disposition::Reject { requeue: true }
            }
        }
    }
}

#[async_trait]
impl MessageHandler for InvoicingRouter {
    fn name(&self) -> &str {
        "invoicing-router"
    }

    async fn handle(&self, payload: &[u8]) -> Disposition {
        self.route(payload).await
    }
}
