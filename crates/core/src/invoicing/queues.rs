use integrahub_domain::constants::{
    INVOICING_QUEUE_PREFIX, INVOICING_QUEUE_SUFFIX, INVOICING_REQUESTS_QUEUE,
    INVOICING_RESPONSES_QUEUE,
};
use integrahub_domain::Result;

use super::ports::MessageBroker;

/// `invoicing.<provider>.requests`
pub fn provider_requests_queue(provider: &str) -> String {
    format!("{INVOICING_QUEUE_PREFIX}.{}.{INVOICING_QUEUE_SUFFIX}", provider.trim().to_lowercase())
}

/// Declare the central, per-provider and response queues.
pub async fn declare_topology<S: AsRef<str>>(broker: &dyn MessageBroker, providers: &[S]) -> Result<()> {
    broker.declare_queue(INVOICING_REQUESTS_QUEUE).await?;
    broker.declare_queue(INVOICING_RESPONSES_QUEUE).await?;
    for provider in providers {
        broker.declare_queue(&provider_requests_queue(provider.as_ref())).await?;
    }
    Ok(())
}
