//! Tracing subscriber setup for the `integrahub` binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` drives filtering (default `info`); `json` switches the
/// formatter to one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(tracing_subscriber::fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Stable label for a hub error, used as a structured log field.
pub fn error_label(error: &integrahub_domain::HubError) -> &'static str {
    use integrahub_domain::HubError;

    match error {
        HubError::Config(_) => "config",
        HubError::Validation(_) => "validation",
        HubError::DuplicateCode(_) => "duplicate_code",
        HubError::NotFound(_) => "not_found",
        HubError::Crypto(_) => "crypto",
        HubError::Store(_) => "store",
        HubError::Cache(_) => "cache",
        HubError::Broker(_) => "broker",
        HubError::Network(_) => "network",
        HubError::Auth(_) => "auth",
        HubError::ProviderUnregistered(_) => "provider_unregistered",
        HubError::NotSupported(_) => "not_supported",
        HubError::TestFailed(_) => "test_failed",
        HubError::AccessTokenNotFound(_) => "access_token_not_found",
        HubError::HasIntegrations(_) => "has_integrations",
        HubError::DeletionForbidden(_) => "deletion_forbidden",
        HubError::Internal(_) => "internal",
    }
}
