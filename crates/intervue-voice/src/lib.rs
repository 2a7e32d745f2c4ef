//! Intervue voice crate - hosted speech-to-text and text-to-speech.
//!
//! Provides trait-based abstractions for transcribing candidate audio and
//! synthesizing interviewer speech, the hosted implementations, and mock
//! implementations for testing without network access.

pub mod error;
pub mod openai;

use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};

pub use error::VoiceError;
pub use openai::{OpenAiSpeech, OpenAiTranscriber};

// =============================================================================
// Types
// =============================================================================

pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, VoiceError>> + Send>>;

/// Synthesized speech, streamed as it arrives from upstream.
pub struct SpeechAudio {
    /// MIME type of the audio, passed through to the browser.
    pub content_type: String,
    pub body: AudioStream,
}

impl std::fmt::Debug for SpeechAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechAudio")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl SpeechAudio {
    /// Collect the whole body into memory.
    pub async fn collect(self) -> Result<Vec<u8>, VoiceError> {
        let mut out = Vec::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Turns a recorded audio clip into text.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe an encoded audio file (e.g. `audio/webm`).
    async fn transcribe(&self, audio: &[u8], file_name: &str, mime: &str) -> Result<String, VoiceError>;
}

/// Turns interviewer text into spoken audio.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Synthesize `text`; `instructions` steer tone and delivery when present.
    async fn synthesize(&self, text: &str, instructions: Option<&str>) -> Result<SpeechAudio, VoiceError>;
}

// =============================================================================
// Mock implementations
// =============================================================================

/// Mock transcription service that returns a fixed text.
#[derive(Debug, Clone)]
pub struct MockTranscriptionService {
    text: String,
    fail: bool,
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self {
            text: "[mock transcription]".to_string(),
            fail: false,
        }
    }
}

impl MockTranscriptionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail: false,
        }
    }

    /// A service whose upstream always fails.
    pub fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(&self, audio: &[u8], file_name: &str, mime: &str) -> Result<String, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }
        if self.fail {
            return Err(VoiceError::Upstream {
                status: 500,
                body: "mock transcription failure".to_string(),
            });
        }

        tracing::debug!(bytes = audio.len(), file_name, mime, "Mock transcription generated");
        Ok(self.text.clone())
    }
}

/// Mock speech service that "speaks" the UTF-8 bytes of the input text.
#[derive(Debug, Default)]
pub struct MockSpeechService {
    fail: bool,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl MockSpeechService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(text, instructions)` pairs received so far.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SpeechService for MockSpeechService {
    async fn synthesize(&self, text: &str, instructions: Option<&str>) -> Result<SpeechAudio, VoiceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((text.to_string(), instructions.map(str::to_string)));
        }
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyText);
        }
        if self.fail {
            return Err(VoiceError::Upstream {
                status: 500,
                body: "mock speech failure".to_string(),
            });
        }

        // Two chunks, so callers exercise streaming.
        let bytes = Bytes::copy_from_slice(text.as_bytes());
        let mid = bytes.len() / 2;
        let chunks = vec![Ok(bytes.slice(..mid)), Ok(bytes.slice(mid..))];
        Ok(SpeechAudio {
            content_type: "audio/mpeg".to_string(),
            body: stream::iter(chunks).boxed(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
