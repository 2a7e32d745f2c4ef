//! Hosted audio API: transcription and speech synthesis.
//!
//! The API key is held as a [`SecretString`] and only exposed as the bearer
//! token of each request.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use intervue_core::config::{SpeechConfig, TranscriptionConfig};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::VoiceError;
use crate::{SpeechAudio, SpeechService, TranscriptionService};

const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

fn http_client() -> Result<reqwest::Client, VoiceError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?)
}

async fn upstream_error(response: reqwest::Response) -> VoiceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    VoiceError::Upstream { status, body }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech-to-text via `{base_url}/audio/transcriptions`.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    config: TranscriptionConfig,
}

impl OpenAiTranscriber {
    pub fn new(api_key: SecretString, config: TranscriptionConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            config,
        })
    }

    fn url(&self) -> String {
        format!("{}/audio/transcriptions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TranscriptionService for OpenAiTranscriber {
    async fn transcribe(&self, audio: &[u8], file_name: &str, mime: &str) -> Result<String, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }

        let file = Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.config.model.clone())
            .text("prompt", self.config.prompt.clone());

        tracing::debug!(bytes = audio.len(), model = %self.config.model, "Sending transcription request");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Deserialization(e.to_string()))?;
        Ok(body.text)
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    speed: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

/// Text-to-speech via `{base_url}/audio/speech`.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    config: SpeechConfig,
}

impl OpenAiSpeech {
    pub fn new(api_key: SecretString, config: SpeechConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            config,
        })
    }

    fn url(&self) -> String {
        format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, text: &'a str, instructions: Option<&'a str>) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            voice: &self.config.voice,
            input: text,
            speed: self.config.speed,
            instructions: instructions.filter(|i| !i.trim().is_empty()),
        }
    }
}

#[async_trait]
impl SpeechService for OpenAiSpeech {
    async fn synthesize(&self, text: &str, instructions: Option<&str>) -> Result<SpeechAudio, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyText);
        }

        tracing::debug!(chars = text.len(), voice = %self.config.voice, "Sending speech request");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request(text, instructions))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_AUDIO_TYPE)
            .to_string();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(VoiceError::from))
            .boxed();

        Ok(SpeechAudio { content_type, body })
    }
}
