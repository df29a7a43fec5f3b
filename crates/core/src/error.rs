//! Unified error types for ipscope.
//!
//! Variants fall into three families: validation (rejected at the transport),
//! transport (the external lookup could not be reached or answered garbage),
//! and storage (fast cache or durable store). A lookup that the external
//! service answers with `status=fail` is not an error; it is a normal record.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the ipscope core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed IP, refused record).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Network or protocol failure talking to the external lookup service.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// External lookup service refused the request because of its rate limit.
    #[error("RATE_LIMITED: {0}")]
    RateLimited(String),

    /// The lookup collaborator cannot resolve several IPs in one call.
    #[error("BATCH_UNSUPPORTED")]
    BatchUnsupported,

    /// Durable store operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Fast cache operation failed.
    #[error("CACHE_ERROR: {0}")]
    FastCache(String),

    /// A record could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for failures reaching or understanding the external lookup service.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::RateLimited(_) | Error::BatchUnsupported)
    }

    /// True for failures of either storage tier.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_) | Error::MigrationFailed(_) | Error::FastCache(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::FastCache(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::Transport(msg) => (-32008, msg.clone()),
            Error::RateLimited(msg) => (-32010, msg.clone()),
            Error::BatchUnsupported => (-32011, "Batch lookups are not supported".to_string()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::FastCache(msg) => (-32003, msg.clone()),
            Error::Serialization(e) => (-32603, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
