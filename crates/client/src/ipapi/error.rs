//! ip-api client error types.

use std::sync::Arc;

/// Errors from the ip-api client.
#[derive(Debug, thiserror::Error)]
pub enum IpApiError {
    /// Base URL is not an http(s) URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Batch exceeds what the service accepts in one request.
    #[error("batch of {0} exceeds the limit of 100 IPs")]
    BatchTooLarge(usize),

    /// Rate limited by ip-api.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Response was well-formed but did not match the request.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for IpApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { IpApiError::Timeout } else { IpApiError::Network(Arc::new(err)) }
    }
}

impl From<IpApiError> for ipscope_core::Error {
    fn from(err: IpApiError) -> Self {
        match err {
            IpApiError::RateLimited => ipscope_core::Error::RateLimited(err.to_string()),
            IpApiError::InvalidBaseUrl(_) | IpApiError::BatchTooLarge(_) => {
                ipscope_core::Error::InvalidInput(err.to_string())
            }
            _ => ipscope_core::Error::Transport(err.to_string()),
        }
    }
}
