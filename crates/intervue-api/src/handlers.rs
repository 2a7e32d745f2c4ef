//! Route handler functions for all API endpoints.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};

use intervue_agent::AgentEvent;
use intervue_core::types::{validate_messages, UiMessage};
use intervue_verify::merge_turn;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_AUDIO_NAME: &str = "audio.webm";
const DEFAULT_AUDIO_MIME: &str = "audio/webm";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<UiMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub pending_verifications: usize,
}

// =============================================================================
// Chat
// =============================================================================

/// POST /api/chat - run one interviewer turn and stream its events.
///
/// Finished background verifications are drained and appended to the
/// caller's history before the agent sees it. The caller's own history is
/// validated first so a rejected request leaves the mailbox untouched.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    validate_messages(&body.messages)?;

    let history = merge_turn(body.messages, &state.mailbox);
    tracing::debug!(messages = history.len(), "Starting chat turn");

    let events = state.agent.respond(history).await?;
    let stream = events.map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_sse_event(event: &AgentEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().event(event.name()).data(data),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize agent event");
            Event::default().event("error").data(r#"{"type":"error"}"#)
        }
    }
}

// =============================================================================
// Voice
// =============================================================================

/// POST /api/transcribe - multipart field `file` to text.
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let no_file = || ApiError::BadRequest("No file provided".to_string());
    let mut multipart = multipart.map_err(|_| no_file())?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(|_| no_file())? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or(DEFAULT_AUDIO_NAME).to_string();
        let mime = field.content_type().unwrap_or(DEFAULT_AUDIO_MIME).to_string();
        let data = field.bytes().await.map_err(|_| no_file())?;
        file = Some((name, mime, data));
        break;
    }

    let (name, mime, data) = file.filter(|(_, _, data)| !data.is_empty()).ok_or_else(no_file)?;

    match state.transcriber.transcribe(&data, &name, &mime).await {
        Ok(text) => {
            tracing::info!(bytes = data.len(), chars = text.len(), "Audio transcribed");
            Ok(Json(TranscribeResponse { text }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Transcription failed");
            Err(ApiError::Internal("Failed to transcribe audio".to_string()))
        }
    }
}

/// POST /api/speech - synthesize interviewer speech, streamed through as it arrives.
pub async fn speech(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let no_text = || ApiError::BadRequest("No text provided".to_string());
    let Json(request) = payload.map_err(|_| no_text())?;
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(no_text)?;
    let instructions = request.instructions.filter(|i| !i.trim().is_empty());

    let audio = state
        .speech
        .synthesize(&text, instructions.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Speech synthesis failed");
            ApiError::Internal("Failed to generate speech".to_string())
        })?;

    Ok((
        [(header::CONTENT_TYPE, audio.content_type)],
        Body::from_stream(audio.body),
    )
        .into_response())
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        pending_verifications: state.dispatcher.in_flight(),
    })
}
