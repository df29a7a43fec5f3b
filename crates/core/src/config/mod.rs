//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (IPSCOPE_*)
//! 2. TOML config file (if IPSCOPE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How the batch orchestrator hands a chunk to the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One resolution per IP with a pacing delay after each.
    #[default]
    Sequential,
    /// One batch call per chunk, falling back to sequential if it fails.
    Chunk,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (IPSCOPE_*)
/// 2. TOML config file (if IPSCOPE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite durable store.
    ///
    /// Set via IPSCOPE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Redis URL for the fast cache. Unset means an in-process cache.
    ///
    /// Set via IPSCOPE_REDIS_URL environment variable.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Fast cache entry lifetime in seconds.
    ///
    /// Set via IPSCOPE_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum entries held by the in-process fast cache.
    #[serde(default = "default_cache_max_capacity")]
    pub cache_max_capacity: u64,

    /// Namespace prefix for fast cache keys.
    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,

    /// Number of IPs per batch chunk.
    ///
    /// Set via IPSCOPE_CHUNK_SIZE environment variable.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay after each resolved IP in a batch, in milliseconds.
    ///
    /// Set via IPSCOPE_PACING_DELAY_MS environment variable.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Batch dispatch mode: "sequential" (default) or "chunk".
    #[serde(default)]
    pub dispatch_mode: DispatchMode,

    /// Base URL of the ip-api compatible lookup service.
    ///
    /// Set via IPSCOPE_API_BASE_URL environment variable.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// User-Agent string for lookup requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Lookup request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum spacing between outbound lookup requests, across all callers.
    /// Zero disables the client-side limiter.
    #[serde(default)]
    pub min_request_interval_ms: u64,

    /// Seconds a paged batch session may sit untouched before it is dropped.
    ///
    /// Set via IPSCOPE_SESSION_IDLE_SECS environment variable.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ipscope.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_cache_max_capacity() -> u64 {
    100_000
}

fn default_cache_key_prefix() -> String {
    "ip:".into()
}

fn default_chunk_size() -> usize {
    10
}

fn default_pacing_delay_ms() -> u64 {
    100
}

fn default_api_base_url() -> String {
    "http://ip-api.com".into()
}

fn default_user_agent() -> String {
    "ipscope/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_session_idle_secs() -> u64 {
    900
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            redis_url: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_capacity: default_cache_max_capacity(),
            cache_key_prefix: default_cache_key_prefix(),
            chunk_size: default_chunk_size(),
            pacing_delay_ms: default_pacing_delay_ms(),
            dispatch_mode: DispatchMode::default(),
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            min_request_interval_ms: 0,
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl AppConfig {
    /// Fast cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Pacing delay as Duration.
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Idle lifetime of a paged batch session.
    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `IPSCOPE_`
    /// 2. TOML file from `IPSCOPE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("IPSCOPE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("IPSCOPE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
