use std::sync::Arc;

use async_trait::async_trait;
use integrahub_domain::InvoiceResponse;
use tracing::{debug, warn};

use super::ports::{Disposition, InvoiceResponseHandler, MessageHandler};

/// Consumes `invoicing.responses` and hands each response to the business
/// layer.
pub struct InvoiceResponseConsumer {
    handler: Arc<dyn InvoiceResponseHandler>,
}

impl InvoiceResponseConsumer {
    pub fn new(handler: Arc<dyn InvoiceResponseHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl MessageHandler for InvoiceResponseConsumer {
    fn name(&self) -> &str {
        "invoicing-responses"
    }

    async fn handle(&self, payload: &[u8]) -> Disposition {
        let response: InvoiceResponse = match serde_json::from_slice(payload) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "malformed invoice response discarded");
                return Disposition::Reject { requeue: false };
            }
        };

        let correlation_id = response.correlation_id.clone();
        match self.handler.on_response(response).await {
            Ok(()) => {
                debug!(correlation_id = %correlation_id, "invoice response handled");
                Disposition::Ack
            }
            Err(err) => {
                warn!(correlation_id = %correlation_id, error = %err, "invoice response handler failed");
                Disposition::Reject { requeue: err.is_transient() }
            }
        }
    }
}
