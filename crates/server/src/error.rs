//! Structured errors for the ipscope server.
//!
//! Core errors carry their own codes; these cover what the transport rejects
//! before the core is ever called.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the ipscope server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid input parameters (e.g., malformed IP address).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No live batch session with this id.
    #[error("SESSION_NOT_FOUND: no active batch session {0}")]
    UnknownSession(u64),
}

impl From<ServerError> for McpError {
    fn from(err: ServerError) -> Self {
        let (code, message) = match &err {
            ServerError::InvalidInput(msg) => (-32602, msg.clone()),
            ServerError::UnknownSession(_) => (-32004, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
