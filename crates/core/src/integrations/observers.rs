//! Integration-created observers
//!
//! Observers are notified on detached tasks after an integration is
//! persisted. Each task carries a child of the service's shutdown token and
//! its own failure domain: errors are logged, panics are caught and logged,
//! and nothing propagates back to the creating call.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use integrahub_domain::{Integration, IntegrationTypeId, Result};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::registry::IntegrationRegistry;

#[async_trait]
pub trait IntegrationObserver: Send + Sync {
    async fn on_integration_created(
        &self,
        cancel: CancellationToken,
        integration: Integration,
    ) -> Result<()>;
}

struct FnObserver<F>(F);

#[async_trait]
impl<F, Fut> IntegrationObserver for FnObserver<F>
where
    F: Fn(CancellationToken, Integration) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn on_integration_created(
        &self,
        cancel: CancellationToken,
        integration: Integration,
    ) -> Result<()> {
        (self.0)(cancel, integration).await
    }
}

/// Wrap an async closure as an observer.
pub fn observer_fn<F, Fut>(callback: F) -> Arc<dyn IntegrationObserver>
where
    F: Fn(CancellationToken, Integration) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnObserver(callback))
}

/// Forwards only integrations of one type.
struct TypeFiltered {
    type_id: IntegrationTypeId,
    inner: Arc<dyn IntegrationObserver>,
}

#[async_trait]
impl IntegrationObserver for TypeFiltered {
    async fn on_integration_created(
        &self,
        cancel: CancellationToken,
        integration: Integration,
    ) -> Result<()> {
        if integration.integration_type_id != self.type_id {
            return Ok(());
        }
        self.inner.on_integration_created(cancel, integration).await
    }
}

/// Append-only observer list.
#[derive(Default)]
pub struct ObserverList {
    observers: Mutex<Vec<Arc<dyn IntegrationObserver>>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn IntegrationObserver>) {
        self.observers.lock().push(observer);
    }

    /// Register an observer that only sees integrations of `type_id`.
    pub fn register_for_type(&self, type_id: IntegrationTypeId, observer: Arc<dyn IntegrationObserver>) {
        self.register(Arc::new(TypeFiltered { type_id, inner: observer }));
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }

    /// Spawn one detached task per observer.
    ///
    /// Returns the task handles; callers are free to drop them. Outside a
    /// tokio runtime nothing is dispatched.
    pub fn notify_created(
        &self,
        integration: &Integration,
        shutdown: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let observers = self.observers.lock().clone();
        if observers.is_empty() {
            return Vec::new();
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(
                integration_id = integration.id,
                "no async runtime available, skipping observer dispatch"
            );
            return Vec::new();
        };

        observers
            .into_iter()
            .enumerate()
            .map(|(index, observer)| {
                let cancel = shutdown.child_token();
                let integration = integration.clone();
                handle.spawn(run_observer(index, observer, cancel, integration))
            })
            .collect()
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList").field("len", &self.len()).finish()
    }
}

async fn run_observer(
    index: usize,
    observer: Arc<dyn IntegrationObserver>,
    cancel: CancellationToken,
    integration: Integration,
) {
    let integration_id = integration.id;
    let call = AssertUnwindSafe(observer.on_integration_created(cancel.clone(), integration))
        .catch_unwind();

    tokio::select! {
        () = cancel.cancelled() => {
            debug!(observer = index, integration_id, "observer cancelled");
        }
        outcome = call => match outcome {
            Ok(Ok(())) => debug!(observer = index, integration_id, "observer completed"),
            Ok(Err(err)) => warn!(
                observer = index,
                integration_id,
                error = %err,
                "observer failed"
            ),
            Err(panic) => error!(
                observer = index,
                integration_id,
                panic = panic_message(panic.as_ref()),
                "observer panicked"
            ),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Registers the provider's webhooks for each new active integration.
///
/// Calls the provider directly (not the service), so it can be installed on
/// the service's own observer list.
pub struct WebhookAutoRegistration {
    registry: Arc<IntegrationRegistry>,
    base_url: Option<String>,
}

impl WebhookAutoRegistration {
    pub fn new(registry: Arc<IntegrationRegistry>, base_url: Option<String>) -> Self {
        Self { registry, base_url }
    }
}

#[async_trait]
impl IntegrationObserver for WebhookAutoRegistration {
    async fn on_integration_created(
        &self,
        cancel: CancellationToken,
        integration: Integration,
    ) -> Result<()> {
        if !integration.is_active {
            debug!(integration_id = integration.id, "inactive integration, webhooks not registered");
            return Ok(());
        }
        let Some(base_url) = self.base_url.as_deref() else {
            warn!(integration_id = integration.id, "no webhook base URL configured");
            return Ok(());
        };
        let Some(provider) = self.registry.get(integration.integration_type_id) else {
            return Ok(());
        };

        let created = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            created = provider.create_webhook(integration.id, base_url) => created,
        };

        match created {
            Ok(result) => {
                debug!(integration_id = integration.id, result = %result, "webhooks registered");
                Ok(())
            }
            Err(err) if err.is_not_supported() => Ok(()),
            Err(err) => Err(err.with_context(format!("auto-register webhooks for {}", integration.id))),
        }
    }
}
