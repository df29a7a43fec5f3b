//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, DispatchMode};
use thiserror::Error;

/// Largest batch the ip-api batch endpoint accepts in one request.
pub const MAX_CHUNK_SIZE: usize = 100;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` or `session_idle_secs` is 0
    /// - `chunk_size` is 0 or above 100
    /// - `pacing_delay_ms` exceeds one minute
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_key_prefix` is empty
    /// - `api_base_url` is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }

        if self.session_idle_secs == 0 {
            return Err(invalid("session_idle_secs", "must be greater than 0"));
        }

        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than 0"));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(invalid("chunk_size", "must not exceed 100"));
        }

        if self.pacing_delay_ms > 60_000 {
            return Err(invalid("pacing_delay_ms", "must not exceed 1 minute (60000ms)"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_key_prefix.is_empty() {
            return Err(invalid("cache_key_prefix", "must not be empty"));
        }

        match url::Url::parse(&self.api_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(invalid("api_base_url", "must be an http(s) URL")),
        }

        if self.pacing_delay_ms == 0 && self.dispatch_mode == DispatchMode::Sequential {
            tracing::warn!("pacing_delay_ms is 0; batch lookups will not be throttled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = AppConfig { cache_ttl_secs: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("cache_ttl_secs"));
    }

    #[test]
    fn test_validate_zero_session_idle() {
        let config = AppConfig { session_idle_secs: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("session_idle_secs"));
    }

    #[test]
    fn test_validate_chunk_size_bounds() {
        let config = AppConfig { chunk_size: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("chunk_size"));

        let config = AppConfig { chunk_size: 101, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("chunk_size"));

        let config = AppConfig { chunk_size: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_pacing_limit() {
        let config = AppConfig { pacing_delay_ms: 60_001, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("pacing_delay_ms"));

        let config = AppConfig { pacing_delay_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_strings() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));

        let config = AppConfig { cache_key_prefix: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("cache_key_prefix"));
    }

    #[test]
    fn test_validate_base_url() {
        let config = AppConfig { api_base_url: "ftp://ip-api.com".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("api_base_url"));

        let config = AppConfig { api_base_url: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("api_base_url"));

        let config = AppConfig { api_base_url: "https://pro.ip-api.com".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
