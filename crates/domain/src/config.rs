//! Configuration structures

use serde::{Deserialize, Serialize};

use crate::errors::{HubError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    pub security: SecurityConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub invoicing: InvoicingConfig,
}

impl HubConfig {
    /// Startup validation. A malformed encryption key is fatal.
    pub fn validate(&self) -> Result<()> {
        let key_len = self.security.encryption_key.len();
        if key_len != 32 {
            return Err(HubError::Config(format!(
                "ENCRYPTION_KEY must be exactly 32 bytes, got {key_len}"
            )));
        }
        if self.database.pool_size == 0 {
            return Err(HubError::Config("database pool size must be at least 1".into()));
        }
        Ok(())
    }

    /// Public base URL used to build webhook callbacks.
    pub fn webhook_base_url(&self) -> Option<String> {
        self.webhooks.resolve_base_url()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Raw AES-256 key; exactly 32 bytes.
    pub encryption_key: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig").field("encryption_key", &"[REDACTED]").finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Preferred public base URL (`WEBHOOK_BASE_URL`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Fallback public base URL (`URL_BASE_SWAGGER`).
    #[serde(default)]
    pub swagger_base_url: Option<String>,
}

impl WebhookConfig {
    pub fn resolve_base_url(&self) -> Option<String> {
        [self.base_url.as_deref(), self.swagger_base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(|url| url.trim().trim_end_matches('/'))
            .find(|url| !url.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "integrahub.db".to_string(), pool_size: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_capacity: 100_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8080".to_string(), log_json: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicingConfig {
    /// Providers that own a per-provider request queue.
    pub providers: Vec<String>,
    /// Dead letters retained by the broker; the oldest are dropped first.
    #[serde(default = "default_max_dead_letters")]
    pub max_dead_letters: usize,
}

pub const DEFAULT_MAX_DEAD_LETTERS: usize = 1_000;

fn default_max_dead_letters() -> usize {
    DEFAULT_MAX_DEAD_LETTERS
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self { providers: vec!["factus".to_string()], max_dead_letters: DEFAULT_MAX_DEAD_LETTERS }
    }
}
