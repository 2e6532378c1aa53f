//! Error types for the agent.

use product_watch::WatchError;

/// All errors that can occur in the agent.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown message type")]
    UnknownMessageType(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Watcher is not running")]
    WatcherGone,

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether the error came from a bad inbound line rather than from the
    /// agent itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AgentError::ParseError(_)
                | AgentError::UnknownMessageType(_)
                | AgentError::InvalidMessage(_)
        )
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
