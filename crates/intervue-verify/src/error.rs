//! Error types for background verification.

use std::time::Duration;

use intervue_core::error::IntervueError;

/// Why a verification produced a failure record instead of a verdict.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("verification timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),
    #[error("confidence {0} is outside [-1, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("verification task panicked: {0}")]
    Panicked(String),
}

impl From<VerifyError> for IntervueError {
    fn from(err: VerifyError) -> Self {
        IntervueError::Verification(err.to_string())
    }
}
