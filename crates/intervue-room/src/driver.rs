//! Async driver that executes coordinator effects against real devices and services.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::coordinator::{Effect, Gesture, PushToTalk};
use crate::error::RoomError;
use crate::status::ConversationStatus;

/// Microphone and speaker control.
#[async_trait]
pub trait AudioDevices: Send {
    async fn start_capture(&mut self) -> Result<(), RoomError>;
    /// Stop the microphone and return the encoded clip.
    async fn stop_capture(&mut self) -> Result<Vec<u8>, RoomError>;
    async fn stop_playback(&mut self);
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, RoomError>;
}

/// Where finished user messages go (the chat client).
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: String) -> Result<(), RoomError>;
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
}

/// Posts clips to the server's `/api/transcribe` endpoint.
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
}

impl HttpTranscriber {
    pub const FILE_NAME: &'static str = "audio.webm";
    pub const MIME: &'static str = "audio/webm";

    pub fn new(server_url: &str) -> Result<Self, RoomError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RoomError::Transcription(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/api/transcribe", server_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, RoomError> {
        let part = Part::bytes(audio.to_vec())
            .file_name(Self::FILE_NAME)
            .mime_str(Self::MIME)
            .map_err(|e| RoomError::Transcription(e.to_string()))?;
        let response = self
            .client
            .post(&self.url)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| RoomError::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RoomError::Transcription(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }
        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| RoomError::Transcription(e.to_string()))?;
        Ok(body.text)
    }
}

/// Owns the coordinator and runs every effect it emits to completion.
///
/// All failures are logged and swallowed; the recorder always returns to idle.
pub struct PushToTalkDriver<D, T, S> {
    coordinator: PushToTalk,
    devices: D,
    transcriber: T,
    sink: S,
}

impl<D, T, S> PushToTalkDriver<D, T, S>
where
    D: AudioDevices,
    T: Transcriber,
    S: MessageSink,
{
    pub fn new(coordinator: PushToTalk, devices: D, transcriber: T, sink: S) -> Self {
        Self {
            coordinator,
            devices,
            transcriber,
            sink,
        }
    }

    pub fn coordinator(&self) -> &PushToTalk {
        &self.coordinator
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub async fn gesture(&mut self, gesture: Gesture) {
        let effects = self.coordinator.gesture(gesture);
        self.run(effects).await;
    }

    pub async fn status_changed(&mut self, status: ConversationStatus) {
        let effects = self.coordinator.status_changed(status);
        self.run(effects).await;
    }

    async fn run(&mut self, effects: Vec<Effect>) {
        let mut pending: VecDeque<Effect> = effects.into();

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::StopPlayback => self.devices.stop_playback().await,
                Effect::StartCapture => {
                    if let Err(e) = self.devices.start_capture().await {
                        self.coordinator.capture_failed(&e);
                    }
                }
                Effect::StopCapture => match self.devices.stop_capture().await {
                    Ok(audio) => pending.extend(self.coordinator.captured(audio)),
                    Err(e) => self.coordinator.capture_failed(&e),
                },
                Effect::Transcribe(audio) => {
                    let outcome = self.transcriber.transcribe(&audio).await;
                    pending.extend(self.coordinator.transcribed(outcome, Local::now()));
                }
                Effect::Send(text) => {
                    if let Err(e) = self.sink.send(text).await {
                        tracing::warn!(error = %e, "Failed to send utterance");
                    }
                }
            }
        }
    }
}
