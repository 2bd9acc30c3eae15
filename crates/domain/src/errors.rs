//! Error types used throughout the hub

pub use integrahub_common::{ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the integration hub
///
/// Each variant is a sentinel callers branch on; the payload carries the
/// human-readable detail (prefixed with operation context via
/// [`HubError::with_context`]).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("No provider registered: {0}")]
    ProviderUnregistered(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Connection test failed: {0}")]
    TestFailed(String),

    #[error("Access token not found: {0}")]
    AccessTokenNotFound(String),

    #[error("Integration type has integrations: {0}")]
    HasIntegrations(String),

    #[error("Deletion forbidden: {0}")]
    DeletionForbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Prefix the message with operation context, keeping the variant.
    #[must_use]
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        let wrap = |message: String| format!("{context}: {message}");
        match self {
            Self::Config(m) => Self::Config(wrap(m)),
            Self::Validation(m) => Self::Validation(wrap(m)),
            Self::DuplicateCode(m) => Self::DuplicateCode(wrap(m)),
            Self::NotFound(m) => Self::NotFound(wrap(m)),
            Self::Crypto(m) => Self::Crypto(wrap(m)),
            Self::Store(m) => Self::Store(wrap(m)),
            Self::Cache(m) => Self::Cache(wrap(m)),
            Self::Broker(m) => Self::Broker(wrap(m)),
            Self::Network(m) => Self::Network(wrap(m)),
            Self::Auth(m) => Self::Auth(wrap(m)),
            Self::ProviderUnregistered(m) => Self::ProviderUnregistered(wrap(m)),
            Self::NotSupported(m) => Self::NotSupported(wrap(m)),
            Self::TestFailed(m) => Self::TestFailed(wrap(m)),
            Self::AccessTokenNotFound(m) => Self::AccessTokenNotFound(wrap(m)),
            Self::HasIntegrations(m) => Self::HasIntegrations(wrap(m)),
            Self::DeletionForbidden(m) => Self::DeletionForbidden(wrap(m)),
            Self::Internal(m) => Self::Internal(wrap(m)),
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id}"))
    }

    pub fn not_supported(operation: &str) -> Self {
        Self::NotSupported(operation.to_string())
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub const fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }

    /// Whether retrying the same call could succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Cache(_) | Self::Broker(_) | Self::Network(_))
    }
}

impl ErrorClassification for HubError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound(_) | Self::DuplicateCode(_) | Self::NotSupported(_) => ErrorSeverity::Info,
            Self::Validation(_)
            | Self::Auth(_)
            | Self::TestFailed(_)
            | Self::AccessTokenNotFound(_)
            | Self::HasIntegrations(_)
            | Self::DeletionForbidden(_)
            | Self::ProviderUnregistered(_) => ErrorSeverity::Warning,
            Self::Store(_) | Self::Cache(_) | Self::Broker(_) | Self::Network(_) => {
                ErrorSeverity::Error
            }
            Self::Config(_) | Self::Crypto(_) | Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("json: {err}"))
    }
}

/// Result type alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;
