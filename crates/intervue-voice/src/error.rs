//! Error types for speech-to-text and text-to-speech.

use intervue_core::error::IntervueError;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("no audio provided")]
    EmptyAudio,
    #[error("no text provided")]
    EmptyText,
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("failed to parse upstream response: {0}")]
    Deserialization(String),
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        VoiceError::Http(err.to_string())
    }
}

impl From<VoiceError> for IntervueError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::EmptyText => IntervueError::Speech(err.to_string()),
            other => IntervueError::Transcription(other.to_string()),
        }
    }
}
