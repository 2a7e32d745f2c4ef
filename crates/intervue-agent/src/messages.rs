//! Hosted Messages API client.
//!
//! Request and response shapes cover what the interviewer and the background
//! checker need: text, client tool calls and results, PDF documents, and
//! server-side tool blocks (web search/fetch) which are carried through
//! verbatim so a paused turn can be resumed.
//!
//! The API key is held as a [`SecretString`] and only exposed when building
//! request headers.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use intervue_core::types::Role;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;

/// Beta features the interviewer relies on (hosted fetch and the memory tool).
pub const DEFAULT_BETAS: &[&str] = &["web-fetch-2025-09-10", "context-management-2025-06-27"];

// =============================================================================
// Wire types
// =============================================================================

/// One content block. Block kinds the client does not model are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Known(KnownBlock),
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnownBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    Document {
        source: DocumentSource,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Known(KnownBlock::Text { text: text.into() })
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::Known(KnownBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        })
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        ContentBlock::Known(KnownBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        })
    }

    /// A base64-encoded PDF document block.
    pub fn pdf(data: String) -> Self {
        ContentBlock::Known(KnownBlock::Document {
            source: DocumentSource {
                kind: "base64".to_string(),
                media_type: "application/pdf".to_string(),
                data,
            },
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Known(KnownBlock::Text { text }) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ApiMessage {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    PauseTurn,
    Refusal,
    #[serde(other)]
    Other,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::ToolUse => "tool_use",
            StopReason::PauseTurn => "pause_turn",
            StopReason::Refusal => "refusal",
            StopReason::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

impl MessagesResponse {
    /// A reply made of one text block that ends the turn.
    pub fn end_turn(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some(StopReason::EndTurn),
        }
    }

    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentBlock::as_text).collect()
    }

    /// Client tool calls requested in this response, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Known(KnownBlock::ToolUse { id, name, input }) => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Client seam
// =============================================================================

/// Anything that can answer a Messages request.
#[async_trait]
pub trait MessagesApi: Send + Sync {
    async fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse, AgentError>;
}

/// Production client for the hosted Messages API.
pub struct MessagesClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    api_version: String,
    betas: Vec<String>,
}

impl MessagesClient {
    pub fn new(api_key: SecretString, base_url: &str, api_version: &str) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            betas: DEFAULT_BETAS.iter().map(|b| b.to_string()).collect(),
        })
    }

    pub fn with_betas(mut self, betas: Vec<String>) -> Self {
        self.betas = betas;
        self
    }

    fn url(&self) -> String {
        format!("{}/messages", self.base_url)
    }
}

#[async_trait]
impl MessagesApi for MessagesClient {
    async fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse, AgentError> {
        let mut builder = self
            .client
            .post(self.url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", &self.api_version)
            .json(request);
        if !self.betas.is_empty() {
            builder = builder.header("anthropic-beta", self.betas.join(","));
        }

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending Messages request"
        );

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| AgentError::Deserialization(e.to_string()))
    }
}

/// Replays queued responses in order and records every request it receives.
///
/// Used for tests and offline development. Runs out with an HTTP error.
#[derive(Default)]
pub struct ScriptedMessages {
    responses: Mutex<VecDeque<Result<MessagesResponse, AgentError>>>,
    requests: Mutex<Vec<MessagesRequest>>,
}

impl ScriptedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: MessagesResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn fail(self, error: AgentError) -> Self {
        self.push(Err(error));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<MessagesRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, response: Result<MessagesResponse, AgentError>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }
}

#[async_trait]
impl MessagesApi for ScriptedMessages {
    async fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse, AgentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.responses
            .lock()
            .map_err(|e| AgentError::Http(format!("script lock poisoned: {}", e)))?
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Http("no scripted response left".to_string())))
    }
}
