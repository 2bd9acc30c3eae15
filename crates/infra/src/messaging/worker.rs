//! Queue worker driving a [`MessageHandler`] against one broker queue.
//!
//! The worker owns its join handle and cancellation token: `start` spawns
//! the consume loop, `stop` cancels it and waits for the task within
//! `join_timeout`. Every handler call is bounded by `handler_timeout`; a
//! timed-out message is requeued, a panicking handler dead-letters it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use integrahub_core::{Delivery, Disposition, MessageBroker, MessageHandler};
use integrahub_domain::{HubError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct QueueWorkerConfig {
    /// Upper bound for a single handler call
    pub handler_timeout: Duration,
    /// Pause after a broker error before receiving again
    pub error_backoff: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for QueueWorkerConfig {
    fn default() -> Self {
        Self {
            handler_timeout: Duration::from_secs(120),
            error_backoff: Duration::from_millis(500),
            join_timeout: Duration::from_secs(5),
        }
    }
}

pub struct QueueWorker {
    broker: Arc<dyn MessageBroker>,
    queue: String,
    handler: Arc<dyn MessageHandler>,
    config: QueueWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl QueueWorker {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        queue: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
        config: QueueWorkerConfig,
    ) -> Self {
        Self {
            broker,
            queue: queue.into(),
            handler,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    #[instrument(skip(self), fields(queue = %self.queue, handler = self.handler.name()))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(HubError::Internal(format!("worker for '{}' already running", self.queue)));
        }

        self.cancellation = CancellationToken::new();

        let broker = Arc::clone(&self.broker);
        let handler = Arc::clone(&self.handler);
        let queue = self.queue.clone();
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::process_loop(broker, queue, handler, config, cancel).await;
        }));
        info!("queue worker started");
        Ok(())
    }

    #[instrument(skip(self), fields(queue = %self.queue))]
    pub async fn stop(&mut self) -> Result<()> {
        self.cancellation.cancel();

        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };
        match tokio::time::timeout(self.config.join_timeout, handle).await {
            Ok(Ok(())) => {
                info!("queue worker stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "queue worker task panicked");
                Err(HubError::Internal(format!("worker for '{}' panicked", self.queue)))
            }
            Err(_) => {
                warn!("queue worker did not stop within timeout");
                Err(HubError::Internal(format!("worker for '{}' stop timed out", self.queue)))
            }
        }
    }

    async fn process_loop(
        broker: Arc<dyn MessageBroker>,
        queue: String,
        handler: Arc<dyn MessageHandler>,
        config: QueueWorkerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                () = cancel.cancelled() => break,
                received = broker.receive(&queue) => received,
            };

            match received {
                Ok(Some(delivery)) => {
                    Self::dispatch(broker.as_ref(), &queue, handler.as_ref(), &config, delivery).await;
                }
                Ok(None) => {
                    debug!(queue = %queue, "broker closed");
                    break;
                }
                Err(err) => {
                    error!(queue = %queue, error = %err, "receive failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(config.error_backoff) => {}
                    }
                }
            }
        }
        debug!(queue = %queue, "queue worker loop exited");
    }

    async fn dispatch(
        broker: &dyn MessageBroker,
        queue: &str,
        handler: &dyn MessageHandler,
        config: &QueueWorkerConfig,
        delivery: Delivery,
    ) {
        let call = AssertUnwindSafe(handler.handle(&delivery.payload)).catch_unwind();
        let disposition = match tokio::time::timeout(config.handler_timeout, call).await {
            Ok(Ok(disposition)) => disposition,
            Ok(Err(_)) => {
                error!(queue, handler = handler.name(), tag = delivery.tag, "handler panicked");
                Disposition::Reject { requeue: false }
            }
            Err(_) => {
                warn!(queue, handler = handler.name(), tag = delivery.tag, "handler timed out");
                Disposition::Reject { requeue: true }
            }
        };

        let settled = match disposition {
            Disposition::Ack => broker.ack(queue, delivery.tag).await,
            Disposition::Reject { requeue } => broker.reject(queue, delivery.tag, requeue).await,
        };
        if let Err(err) = settled {
            error!(queue, tag = delivery.tag, error = %err, "failed to settle delivery");
        }
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
