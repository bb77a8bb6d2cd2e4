//! Protocol Error Types

use agent_core::AgentError;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors raised by a session, the provider or the consumer
#[derive(Error, Debug)]
pub enum McpError {
    /// Channel could not be opened or broke mid-call; the session is unusable
    #[error("Transport error: {0}")]
    Transport(String),

    /// No response within the request timeout
    #[error("Request '{0}' timed out")]
    Timeout(String),

    /// List/call attempted before the handshake completed
    #[error("Session not initialized")]
    NotInitialized,

    /// Peer sent something that does not follow the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Structured error response from the provider
    #[error("Server error {code}: {message}")]
    Server { code: i64, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Stable tag for logs and API payloads
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Protocol(_) => "PROTOCOL",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
        }
    }

    /// Whether the session that produced this error must be discarded
    pub const fn is_fatal_to_session(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}

impl From<McpError> for AgentError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Timeout(method) => Self::Timeout(format!("tool provider request '{method}'")),
            McpError::Transport(msg) => Self::ToolExecution(format!("tool provider unavailable: {msg}")),
            other => Self::ToolExecution(other.to_string()),
        }
    }
}
