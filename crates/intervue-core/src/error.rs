use thiserror::Error;

/// Top-level error type for Intervue.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define their
/// own error types and implement `From<SubsystemError> for IntervueError` so
/// that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IntervueError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Invalid message history: {0}")]
    InvalidHistory(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for IntervueError {
    fn from(err: toml::de::Error) -> Self {
        IntervueError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for IntervueError {
    fn from(err: toml::ser::Error) -> Self {
        IntervueError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for IntervueError {
    fn from(err: serde_json::Error) -> Self {
        IntervueError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Intervue operations.
pub type Result<T> = std::result::Result<T, IntervueError>;
