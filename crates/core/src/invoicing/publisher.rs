use std::sync::Arc;

use chrono::Utc;
use integrahub_domain::constants::INVOICING_REQUESTS_QUEUE;
use integrahub_domain::{InvoiceRequest, Result};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::ports::MessageBroker;

/// Business-layer entry point into the invoicing fabric.
pub struct InvoiceRequestPublisher {
    broker: Arc<dyn MessageBroker>,
}

impl InvoiceRequestPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }

    /// Stamp and publish a request to `invoicing.requests`.
    ///
    /// A blank correlation id is replaced with a fresh UUID v4. Returns the
    /// correlation id the response will carry.
    #[instrument(skip(self, request), fields(invoice_id = request.invoice_id, provider = %request.provider))]
    pub async fn publish(&self, mut request: InvoiceRequest) -> Result<String> {
        if request.correlation_id.trim().is_empty() {
            request.correlation_id = Uuid::new_v4().to_string();
        }
        request.timestamp = Utc::now();

        let payload = serde_json::to_vec(&request)?;
        self.broker
            .publish(INVOICING_REQUESTS_QUEUE, payload)
            .await
            .map_err(|e| e.with_context("publish invoice request"))?;

        debug!(correlation_id = %request.correlation_id, "invoice request published");
        Ok(request.correlation_id)
    }
}
