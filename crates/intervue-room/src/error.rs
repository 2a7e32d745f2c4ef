//! Error types for the interview room client.

use intervue_core::error::IntervueError;

use crate::recorder::RecorderState;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("invalid recorder transition: {from} -> {to}")]
    InvalidTransition { from: RecorderState, to: RecorderState },
    #[error("audio capture failed: {0}")]
    Capture(String),
    #[error("no audio captured")]
    NoAudio,
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("transcription was blank")]
    BlankTranscript,
    #[error("failed to send message: {0}")]
    Send(String),
}

impl From<RoomError> for IntervueError {
    fn from(err: RoomError) -> Self {
        IntervueError::Recording(err.to_string())
    }
}
