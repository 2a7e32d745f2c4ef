//! Error types for the interviewer agent and its tools.

use intervue_core::error::IntervueError;

/// Errors from the hosted model client, the step loop, or a tool call.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse model response: {0}")]
    Deserialization(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
    #[error("path escapes its root: {0}")]
    PathEscape(String),
    #[error("tool failed: {0}")]
    Tool(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AgentError> for IntervueError {
    fn from(err: AgentError) -> Self {
        IntervueError::Agent(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidInput(err.to_string())
    }
}
