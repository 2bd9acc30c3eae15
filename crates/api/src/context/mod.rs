//! Application context - dependency injection container
//!
//! Startup order: validate config, open the database and apply the schema,
//! build the services, register providers and observers, warm the cache,
//! declare the invoicing topology and start the queue workers. `shutdown`
//! stops the workers before closing the broker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use integrahub_core::invoicing::queues::{declare_topology, provider_requests_queue};
use integrahub_core::{
    CredentialVault, IntegrationCache, IntegrationCategoryRepository, IntegrationLookup,
    IntegrationRegistry, IntegrationRepository, IntegrationService, IntegrationTypeRepository,
    IntegrationTypeService, InvoiceIssuer, InvoiceProcessor, InvoiceRequestPublisher,
    InvoiceResponseConsumer, InvoiceResponseHandler, InvoicingRouter, MessageBroker,
    MessageHandler, WebhookAutoRegistration,
};
use integrahub_domain::constants::integration_types::{FACTUS, SHOPIFY};
use integrahub_domain::constants::{INVOICING_REQUESTS_QUEUE, INVOICING_RESPONSES_QUEUE};
use integrahub_domain::{HubConfig, HubError, InvoiceResponse, Result};
use integrahub_infra::providers::factus;
use integrahub_infra::{
    DbManager, FactusProvider, HttpClient, InMemoryBroker, MokaIntegrationCache, QueueWorker,
    QueueWorkerConfig, ShopifyProvider, SqliteCategoryRepository, SqliteIntegrationRepository,
    SqliteTypeRepository,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

const WORKER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: HubConfig,
    pub db: Arc<DbManager>,
    pub cache: Arc<MokaIntegrationCache>,
    pub integrations: Arc<IntegrationService>,
    pub types: Arc<IntegrationTypeService>,
    pub broker: Arc<InMemoryBroker>,
    pub publisher: Arc<InvoiceRequestPublisher>,

    // Router first, response consumer last; stopped in the same order.
    workers: Mutex<Vec<QueueWorker>>,
}

/// Default business-layer sink: records every invoice outcome in the log.
#[derive(Debug, Default)]
pub struct LoggingResponseHandler;

#[async_trait]
impl InvoiceResponseHandler for LoggingResponseHandler {
    async fn on_response(&self, response: InvoiceResponse) -> Result<()> {
        if response.is_success() {
            info!(
                invoice_id = response.invoice_id,
                provider = %response.provider,
                correlation_id = %response.correlation_id,
                invoice_number = response.invoice_number.as_deref().unwrap_or_default(),
                processing_time_ms = response.processing_time_ms,
                "invoice issued"
            );
        } else {
            warn!(
                invoice_id = response.invoice_id,
                provider = %response.provider,
                correlation_id = %response.correlation_id,
                error_code = response.error_code.as_deref().unwrap_or_default(),
                error = response.error.as_deref().unwrap_or_default(),
                "invoice failed"
            );
        }
        Ok(())
    }
}

impl AppContext {
    /// Build the context with invoice outcomes going to the log.
    pub async fn new(config: HubConfig) -> Result<Self> {
        Self::with_response_handler(config, Arc::new(LoggingResponseHandler)).await
    }

    /// Build the context with a custom sink for invoice responses.
    pub async fn with_response_handler(
        config: HubConfig,
        response_handler: Arc<dyn InvoiceResponseHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let integration_repo = Arc::new(SqliteIntegrationRepository::new(Arc::clone(&db)));
        let type_repo = Arc::new(SqliteTypeRepository::new(Arc::clone(&db)));
        let category_repo = Arc::new(SqliteCategoryRepository::new(Arc::clone(&db)));
        let cache = Arc::new(MokaIntegrationCache::new(config.cache.max_capacity));
        let vault = CredentialVault::from_key(config.security.encryption_key.as_bytes())?;

        let webhook_base_url = config.webhook_base_url();
        if webhook_base_url.is_none() {
            warn!("no webhook base URL configured; webhook operations will be refused");
        }

        let registry = Arc::new(IntegrationRegistry::new());
        let integrations = Arc::new(
            IntegrationService::new(
                Arc::clone(&integration_repo) as Arc<dyn IntegrationRepository>,
                Arc::clone(&type_repo) as Arc<dyn IntegrationTypeRepository>,
                Arc::clone(&cache) as Arc<dyn IntegrationCache>,
                vault.clone(),
                Arc::clone(&registry),
            )
            .with_webhook_base_url(webhook_base_url.clone()),
        );
        let types = Arc::new(IntegrationTypeService::new(
            type_repo as Arc<dyn IntegrationTypeRepository>,
            category_repo as Arc<dyn IntegrationCategoryRepository>,
            integration_repo as Arc<dyn IntegrationRepository>,
            Arc::clone(&cache) as Arc<dyn IntegrationCache>,
            vault,
        ));

        // Providers
        let http = HttpClient::new()?;
        let lookup: Arc<dyn IntegrationLookup> = Arc::new(integrations.resolver().clone());
        let factus_provider = Arc::new(FactusProvider::new(http.clone()));
        integrations.register_provider(FACTUS, factus_provider.clone());
        integrations
            .register_provider(SHOPIFY, Arc::new(ShopifyProvider::new(http, Arc::clone(&lookup))));
        integrations.on_integration_created(
            SHOPIFY,
            Arc::new(WebhookAutoRegistration::new(registry, webhook_base_url)),
        );
        info!(providers = ?integrations.registry().list(), "providers registered");

        match integrations.warm_cache().await {
            Ok(report) => info!(
                metadata_cached = report.metadata_cached,
                credentials_cached = report.credentials_cached,
                errors = report.errors,
                "integration cache warmed"
            ),
            Err(err) => warn!(error = %err, "cache warm-up failed; continuing with a cold cache"),
        }

        // Invoicing fabric
        let broker = Arc::new(InMemoryBroker::with_max_dead_letters(
            config.invoicing.max_dead_letters,
        ));
        let dyn_broker: Arc<dyn MessageBroker> = broker.clone();
        let providers = &config.invoicing.providers;
        declare_topology(dyn_broker.as_ref(), providers.as_slice()).await?;

        let issuers: Vec<Arc<dyn InvoiceIssuer>> = providers
            .iter()
            .filter_map(|provider| match provider.trim().to_lowercase().as_str() {
                factus::PROVIDER_KEY => Some(factus_provider.clone() as Arc<dyn InvoiceIssuer>),
                other => {
                    warn!(
                        provider = other,
                        queue = %provider_requests_queue(other),
                        "no issuer for invoicing provider; requests will stay queued"
                    );
                    None
                }
            })
            .collect();

        let router: Arc<dyn MessageHandler> =
            Arc::new(InvoicingRouter::new(Arc::clone(&dyn_broker), providers));
        let mut handlers = vec![(INVOICING_REQUESTS_QUEUE.to_string(), router)];
        for issuer in issuers {
            let processor =
                InvoiceProcessor::new(Arc::clone(&dyn_broker), Arc::clone(&lookup), issuer);
            let queue = processor.queue();
            let processor: Arc<dyn MessageHandler> = Arc::new(processor);
            handlers.push((queue, processor));
        }
        let consumer: Arc<dyn MessageHandler> =
            Arc::new(InvoiceResponseConsumer::new(response_handler));
        handlers.push((INVOICING_RESPONSES_QUEUE.to_string(), consumer));

        let mut workers: Vec<QueueWorker> = Vec::with_capacity(handlers.len());
        for (queue, handler) in handlers {
            let mut worker =
                QueueWorker::new(Arc::clone(&dyn_broker), queue, handler, QueueWorkerConfig::default());
            if let Err(err) = start_worker(&mut worker).await {
                for started in &mut workers {
                    if let Err(stop_err) = started.stop().await {
                        warn!(queue = started.queue(), error = %stop_err, "failed to stop worker after startup error");
                    }
                }
                broker.close();
                return Err(err);
            }
            workers.push(worker);
        }
        info!(workers = workers.len(), "invoicing workers started");

        let publisher = Arc::new(InvoiceRequestPublisher::new(dyn_broker));

        Ok(Self {
            config,
            db,
            cache,
            integrations,
            types,
            broker,
            publisher,
            workers: Mutex::new(workers),
        })
    }

    /// Check the database, the broker and the queue workers.
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new().add_component(self.check_database_health().await);

        status = status.add_component(if self.broker.is_closed() {
            ComponentHealth::unhealthy("broker", "closed")
        } else {
            ComponentHealth::healthy("broker")
        });

        let workers = self.workers.lock().await;
        let stopped: Vec<&str> =
            workers.iter().filter(|w| !w.is_running()).map(QueueWorker::queue).collect();
        status = status.add_component(if stopped.is_empty() {
            ComponentHealth::healthy("workers")
        } else {
            ComponentHealth::unhealthy("workers", format!("stopped: {}", stopped.join(", ")))
        });
        drop(workers);

        status = status.add_component(if self.integrations.registry().list().is_empty() {
            ComponentHealth::unhealthy("providers", "no provider registered")
        } else {
            ComponentHealth::healthy("providers")
        });

        status.calculate_score();
        status
    }

    /// Uses spawn_blocking; the pool checkout and query are synchronous.
    async fn check_database_health(&self) -> ComponentHealth {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(e)) => {
                warn!(error = %e, "database health check failed");
                ComponentHealth::unhealthy("database", "query failed")
            }
            Err(e) => {
                error!(error = %e, "database health check task panicked");
                ComponentHealth::unhealthy("database", "task panic")
            }
        }
    }

    /// Stop the workers, close the broker and cancel observer tasks.
    ///
    /// Idempotent. Every worker is stopped even when one fails; the first
    /// failure is returned.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutting down application context");

        let mut first_error = None;
        let mut workers = self.workers.lock().await;
        for worker in workers.iter_mut() {
            if let Err(err) = worker.stop().await {
                error!(queue = worker.queue(), error = %err, "worker did not stop cleanly");
                first_error.get_or_insert(err);
            }
        }
        drop(workers);

        self.broker.close();
        self.integrations.shutdown();

        first_error.map_or(Ok(()), Err)
    }
}

/// Start a worker, failing fast when it does not come up in time.
async fn start_worker(worker: &mut QueueWorker) -> Result<()> {
    let queue = worker.queue().to_string();
    tokio::time::timeout(WORKER_START_TIMEOUT, worker.start())
        .await
        .map_err(|_| {
            error!(queue = %queue, timeout_secs = WORKER_START_TIMEOUT.as_secs(), "worker start timed out");
            HubError::Internal(format!("worker for {queue} did not start within 10s"))
        })?
        .map_err(|err| {
            error!(queue = %queue, error = %err, "failed to start worker");
            err.with_context(format!("start worker for {queue}"))
        })
}
