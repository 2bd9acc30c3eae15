//! Configuration loader
//!
//! Loads the hub configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `ENCRYPTION_KEY` is absent, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ENCRYPTION_KEY`: AES-256 key, exactly 32 bytes (required)
//! - `WEBHOOK_BASE_URL`: Public base URL for webhook callbacks
//! - `URL_BASE_SWAGGER`: Fallback public base URL
//! - `INTEGRAHUB_DB_PATH`: Database file path
//! - `INTEGRAHUB_DB_POOL_SIZE`: Connection pool size
//! - `INTEGRAHUB_CACHE_MAX_CAPACITY`: Maximum cached entries
//! - `INTEGRAHUB_BIND_ADDR`: HTTP listen address
//! - `INTEGRAHUB_INVOICING_PROVIDERS`: Comma-separated provider keys
//! - `INTEGRAHUB_MAX_DEAD_LETTERS`: Dead letters kept in memory
//! - `INTEGRAHUB_LOG_FORMAT`: `json` for structured log output
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./integrahub.toml`, `./integrahub.json`, `./config.toml`,
//!    `./config.json` (current working directory)
//! 2. The same names one and two directories up
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use integrahub_domain::constants::{ENV_ENCRYPTION_KEY, ENV_URL_BASE_SWAGGER, ENV_WEBHOOK_BASE_URL};
use integrahub_domain::{
    CacheConfig, DatabaseConfig, HubConfig, HubError, InvoicingConfig, Result, SecurityConfig,
    ServerConfig, WebhookConfig,
};

pub const ENV_DB_PATH: &str = "INTEGRAHUB_DB_PATH";
pub const ENV_DB_POOL_SIZE: &str = "INTEGRAHUB_DB_POOL_SIZE";
pub const ENV_CACHE_MAX_CAPACITY: &str = "INTEGRAHUB_CACHE_MAX_CAPACITY";
pub const ENV_BIND_ADDR: &str = "INTEGRAHUB_BIND_ADDR";
pub const ENV_INVOICING_PROVIDERS: &str = "INTEGRAHUB_INVOICING_PROVIDERS";
pub const ENV_MAX_DEAD_LETTERS: &str = "INTEGRAHUB_MAX_DEAD_LETTERS";
pub const ENV_LOG_FORMAT: &str = "INTEGRAHUB_LOG_FORMAT";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["integrahub.toml", "integrahub.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the encryption key
/// is not in the environment, falls back to loading from a config file.
///
/// # Errors
/// Returns `HubError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A numeric variable does not parse
pub fn load() -> Result<HubConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `ENCRYPTION_KEY` is required; every other section falls back to its
/// defaults.
///
/// # Errors
/// Returns `HubError::Config` if the key is missing or a numeric variable
/// has an invalid value.
pub fn load_from_env() -> Result<HubConfig> {
    let encryption_key = env_var(ENV_ENCRYPTION_KEY)?;

    let database_defaults = DatabaseConfig::default();
    let database = DatabaseConfig {
        path: env_opt(ENV_DB_PATH).unwrap_or(database_defaults.path),
        pool_size: env_parse(ENV_DB_POOL_SIZE)?.unwrap_or(database_defaults.pool_size),
    };

    let cache = CacheConfig {
        max_capacity: env_parse(ENV_CACHE_MAX_CAPACITY)?
            .unwrap_or(CacheConfig::default().max_capacity),
    };

    let server_defaults = ServerConfig::default();
    let server = ServerConfig {
        bind_address: env_opt(ENV_BIND_ADDR).unwrap_or(server_defaults.bind_address),
        log_json: log_format_is_json(),
    };

    let invoicing_defaults = InvoicingConfig::default();
    let invoicing = InvoicingConfig {
        providers: env_opt(ENV_INVOICING_PROVIDERS)
            .map(|raw| parse_provider_list(&raw))
            .unwrap_or(invoicing_defaults.providers),
        max_dead_letters: env_parse(ENV_MAX_DEAD_LETTERS)?
            .unwrap_or(invoicing_defaults.max_dead_letters),
    };

    Ok(HubConfig {
        security: SecurityConfig { encryption_key },
        webhooks: WebhookConfig {
            base_url: env_opt(ENV_WEBHOOK_BASE_URL),
            swagger_base_url: env_opt(ENV_URL_BASE_SWAGGER),
        },
        database,
        cache,
        server,
        invoicing,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `HubError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<HubConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(HubError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            HubError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| HubError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<HubConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| HubError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| HubError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(HubError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Whether `INTEGRAHUB_LOG_FORMAT` asks for JSON output.
pub fn log_format_is_json() -> bool {
    env_opt(ENV_LOG_FORMAT).is_some_and(|format| format.eq_ignore_ascii_case("json"))
}

/// Split a comma-separated provider list into lowercase keys.
fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `HubError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| HubError::Config(format!("Missing required environment variable: {key}")))
}

/// Optional variable; blank counts as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| HubError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
