//! The interviewer: a bounded tool-use loop against the hosted model.

use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use intervue_core::config::AgentConfig;
use intervue_core::types::{Role, UiMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AgentError;
use crate::messages::{ApiMessage, ContentBlock, MessagesApi, MessagesRequest, StopReason};
use crate::tools::Toolbox;

const EVENT_BUFFER: usize = 64;

/// One observable step of an agent turn, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    TextDelta {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    Finish {
        reason: String,
        steps: u32,
    },
    Error {
        message: String,
    },
}

impl AgentEvent {
    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::TextDelta { .. } => "text-delta",
            AgentEvent::ToolCall { .. } => "tool-call",
            AgentEvent::ToolResult { .. } => "tool-result",
            AgentEvent::Finish { .. } => "finish",
            AgentEvent::Error { .. } => "error",
        }
    }
}

pub type AgentStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// Produces the assistant's side of one turn.
#[async_trait]
pub trait ConversationAgent: Send + Sync {
    async fn respond(&self, history: Vec<UiMessage>) -> Result<AgentStream, AgentError>;
}

/// Convert browser history into Messages API turns.
///
/// System messages are dropped (the agent has its own prompt). Consecutive
/// messages from the same role are merged, trailing whitespace is trimmed and
/// messages without text are skipped.
pub fn to_api_messages(history: &[UiMessage]) -> Vec<ApiMessage> {
    let mut out: Vec<ApiMessage> = Vec::new();

    for message in history {
        if message.role == Role::System {
            continue;
        }
        let text = message.joined_text();
        let text = text.trim_end();
        if text.is_empty() {
            continue;
        }

        match out.last_mut() {
            Some(last) if last.role == message.role => last.content.push(ContentBlock::text(text)),
            _ => out.push(ApiMessage {
                role: message.role,
                content: vec![ContentBlock::text(text)],
            }),
        }
    }
    out
}

/// Production interviewer backed by the Messages API and the local toolbox.
#[derive(Clone)]
pub struct InterviewAgent {
    api: Arc<dyn MessagesApi>,
    toolbox: Arc<Toolbox>,
    model: String,
    system_prompt: String,
    max_steps: u32,
    max_tokens: u32,
}

impl InterviewAgent {
    pub fn new(api: Arc<dyn MessagesApi>, toolbox: Arc<Toolbox>, config: &AgentConfig) -> Self {
        Self {
            api,
            toolbox,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_steps: config.max_steps.max(1),
            max_tokens: config.max_tokens,
        }
    }

    async fn run(self, mut messages: Vec<ApiMessage>, tx: mpsc::Sender<AgentEvent>) {
        let tools = self.toolbox.definitions();
        let mut steps = 0u32;

        loop {
            if steps >= self.max_steps {
                tracing::info!(steps, "Agent step budget exhausted");
                let _ = tx
                    .send(AgentEvent::Finish {
                        reason: "max_steps".to_string(),
                        steps,
                    })
                    .await;
                return;
            }
            steps += 1;

            let request = MessagesRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                system: Some(self.system_prompt.clone()),
                messages: messages.clone(),
                tools: tools.clone(),
            };
            let response = match self.api.create(&request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(step = steps, error = %e, "Agent step failed");
                    let _ = tx
                        .send(AgentEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            for text in response.content.iter().filter_map(ContentBlock::as_text) {
                let event = AgentEvent::TextDelta {
                    text: text.to_string(),
                };
                if tx.send(event).await.is_err() {
                    tracing::debug!("Agent stream receiver dropped");
                    return;
                }
            }

            let calls: Vec<(String, String, Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            let stop_reason = response.stop_reason;
            messages.push(ApiMessage::assistant(response.content));

            match stop_reason {
                Some(StopReason::ToolUse) if !calls.is_empty() => {
                    let mut results = Vec::with_capacity(calls.len());
                    for (id, name, input) in calls {
                        let call = AgentEvent::ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        };
                        if tx.send(call).await.is_err() {
                            return;
                        }

                        let (output, is_error) = match self.toolbox.call(&name, input).await {
                            Ok(output) => (output, false),
                            Err(e) => {
                                tracing::warn!(tool = %name, error = %e, "Tool call failed");
                                (e.to_string(), true)
                            }
                        };
                        tracing::debug!(tool = %name, is_error, "Tool call finished");

                        let result = AgentEvent::ToolResult {
                            id: id.clone(),
                            name,
                            output: output.clone(),
                            is_error,
                        };
                        if tx.send(result).await.is_err() {
                            return;
                        }
                        results.push(ContentBlock::tool_result(id, output, is_error));
                    }
                    messages.push(ApiMessage::user(results));
                }
                Some(StopReason::PauseTurn) => {
                    tracing::debug!(step = steps, "Hosted tool paused the turn; resuming");
                }
                other => {
                    let reason = other.map_or("end_turn", |r| r.as_str()).to_string();
                    tracing::info!(steps, reason = %reason, "Agent turn finished");
                    let _ = tx.send(AgentEvent::Finish { reason, steps }).await;
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ConversationAgent for InterviewAgent {
    async fn respond(&self, history: Vec<UiMessage>) -> Result<AgentStream, AgentError> {
        let messages = to_api_messages(&history);
        if messages.is_empty() {
            return Err(AgentError::InvalidInput(
                "history has no user or assistant text".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(self.clone().run(messages, tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Replays fixed events for every turn and records the histories it was given.
#[derive(Default)]
pub struct ScriptedAgent {
    events: Vec<AgentEvent>,
    histories: Mutex<Vec<Vec<UiMessage>>>,
}

impl ScriptedAgent {
    pub fn new(events: Vec<AgentEvent>) -> Self {
        Self {
            events,
            histories: Mutex::new(Vec::new()),
        }
    }

    /// Histories received so far, one per turn.
    pub fn histories(&self) -> Vec<Vec<UiMessage>> {
        match self.histories.lock() {
            Ok(histories) => histories.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ConversationAgent for ScriptedAgent {
    async fn respond(&self, history: Vec<UiMessage>) -> Result<AgentStream, AgentError> {
        if let Ok(mut histories) = self.histories.lock() {
            histories.push(history);
        }
        Ok(stream::iter(self.events.clone()).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::messages::{MessagesResponse, ScriptedMessages};
    use crate::tools::{PdfReader, READ_FILE};
    use crate::workspace::Workspace;
    use intervue_verify::{Mailbox, ScriptedLookup, VerificationDispatcher};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn agent(api: Arc<ScriptedMessages>, dir: &TempDir, max_steps: u32) -> InterviewAgent {
        let context = dir.path().join("context");
        std::fs::create_dir_all(&context).unwrap();
        std::fs::write(context.join("README.md"), "# Jane Doe\nRust, tokio\n").unwrap();

        let dispatcher = Arc::new(VerificationDispatcher::new(
            Arc::new(ScriptedLookup::new()),
            Mailbox::new(),
            Duration::from_secs(1),
        ));
        let toolbox = Arc::new(Toolbox::new(
            Workspace::new(&context),
            MemoryStore::new(dir.path().join("generated")),
            dispatcher,
            PdfReader::new(api.clone(), "claude-haiku-4-5", 1024),
        ));
        let config = AgentConfig {
            max_steps,
            ..AgentConfig::default()
        };
        InterviewAgent::new(api, toolbox, &config)
    }

    async fn collect(agent: &InterviewAgent, history: Vec<UiMessage>) -> Vec<AgentEvent> {
        agent.respond(history).await.unwrap().collect().await
    }

    fn tool_use(id: &str, name: &str, input: Value) -> MessagesResponse {
        MessagesResponse {
            content: vec![ContentBlock::text("Let me check."), ContentBlock::tool_use(id, name, input)],
            stop_reason: Some(StopReason::ToolUse),
        }
    }

    #[test]
    fn test_event_names_match_serialized_tag() {
        let events = vec![
            AgentEvent::TextDelta { text: "hi".to_string() },
            AgentEvent::ToolCall {
                id: "t".to_string(),
                name: "n".to_string(),
                input: json!({}),
            },
            AgentEvent::ToolResult {
                id: "t".to_string(),
                name: "n".to_string(),
                output: "o".to_string(),
                is_error: false,
            },
            AgentEvent::Finish {
                reason: "end_turn".to_string(),
                steps: 1,
            },
            AgentEvent::Error {
                message: "m".to_string(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name());
        }
    }

    #[test]
    fn test_to_api_messages_merges_and_trims() {
        let history = vec![
            UiMessage::text(Role::System, "ignored"),
            UiMessage::text(Role::User, "[Mon] hello"),
            UiMessage::text(Role::Assistant, "Tell me about your cache."),
            UiMessage::text(Role::Assistant, "Authenticity verification result: ID: x\nAnswer: "),
        ];
        let messages = to_api_messages(&history);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content.len(), 2);
        assert_eq!(
            messages[1].content[1].as_text(),
            Some("Authenticity verification result: ID: x\nAnswer:")
        );
    }

    #[tokio::test]
    async fn test_plain_reply_streams_text_then_finish() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(ScriptedMessages::new().respond(MessagesResponse::end_turn(
            "<speech>Hi Jane, tell me about yourself.</speech>",
        )));
        let agent = agent(api.clone(), &dir, 5);

        let events = collect(&agent, vec![UiMessage::text(Role::User, "hello")]).await;
        assert_eq!(
            events,
            vec![
                AgentEvent::TextDelta {
                    text: "<speech>Hi Jane, tell me about yourself.</speech>".to_string()
                },
                AgentEvent::Finish {
                    reason: "end_turn".to_string(),
                    steps: 1
                },
            ]
        );

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system.as_deref().unwrap().contains("README.md"));
        assert!(!requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_result_fed_back() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(
            ScriptedMessages::new()
                .respond(tool_use("t1", READ_FILE, json!({"path": "README.md", "startLine": 1, "endLine": 1})))
                .respond(MessagesResponse::end_turn("Welcome, Jane.")),
        );
        let agent = agent(api.clone(), &dir, 5);

        let events = collect(&agent, vec![UiMessage::text(Role::User, "start")]).await;
        let names: Vec<&str> = events.iter().map(AgentEvent::name).collect();
        assert_eq!(
            names,
            vec!["text-delta", "tool-call", "tool-result", "text-delta", "finish"]
        );
        assert_eq!(
            events[2],
            AgentEvent::ToolResult {
                id: "t1".to_string(),
                name: READ_FILE.to_string(),
                output: "# Jane Doe".to_string(),
                is_error: false,
            }
        );

        let second = &api.requests()[1];
        let last = serde_json::to_value(second.messages.last().unwrap()).unwrap();
        assert_eq!(last["role"], "user");
        assert_eq!(last["content"][0]["type"], "tool_result");
        assert_eq!(last["content"][0]["tool_use_id"], "t1");
        assert_eq!(last["content"][0]["content"], "# Jane Doe");
    }

    #[tokio::test]
    async fn test_tool_error_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(
            ScriptedMessages::new()
                .respond(tool_use("t1", READ_FILE, json!({"path": "../../etc/passwd"})))
                .respond(MessagesResponse::end_turn("Never mind.")),
        );
        let agent = agent(api.clone(), &dir, 5);

        let events = collect(&agent, vec![UiMessage::text(Role::User, "start")]).await;
        assert!(events.iter().any(|e| matches!(e, AgentEvent::ToolResult { is_error: true, .. })));
        assert!(matches!(events.last(), Some(AgentEvent::Finish { steps: 2, .. })));

        let body = serde_json::to_value(api.requests()[1].messages.last().unwrap()).unwrap();
        assert_eq!(body["content"][0]["is_error"], true);
    }

    #[tokio::test]
    async fn test_step_budget_bounds_loop() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(
            ScriptedMessages::new()
                .respond(tool_use("t1", READ_FILE, json!({"path": "README.md"})))
                .respond(tool_use("t2", READ_FILE, json!({"path": "README.md"})))
                .respond(tool_use("t3", READ_FILE, json!({"path": "README.md"}))),
        );
        let agent = agent(api.clone(), &dir, 2);

        let events = collect(&agent, vec![UiMessage::text(Role::User, "start")]).await;
        assert_eq!(
            events.last(),
            Some(&AgentEvent::Finish {
                reason: "max_steps".to_string(),
                steps: 2
            })
        );
        assert_eq!(api.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_pause_turn_resumes() {
        let dir = TempDir::new().unwrap();
        let paused = MessagesResponse {
            content: vec![ContentBlock::Raw(json!({
                "type": "server_tool_use", "id": "srv1", "name": "web_search", "input": {"query": "tokio"}
            }))],
            stop_reason: Some(StopReason::PauseTurn),
        };
        let api = Arc::new(
            ScriptedMessages::new()
                .respond(paused)
                .respond(MessagesResponse::end_turn("tokio is an async runtime.")),
        );
        let agent = agent(api.clone(), &dir, 5);

        let events = collect(&agent, vec![UiMessage::text(Role::User, "what is tokio?")]).await;
        assert!(matches!(events.last(), Some(AgentEvent::Finish { steps: 2, .. })));

        let resumed = serde_json::to_value(&api.requests()[1].messages[1]).unwrap();
        assert_eq!(resumed["role"], "assistant");
        assert_eq!(resumed["content"][0]["type"], "server_tool_use");
    }

    #[tokio::test]
    async fn test_api_failure_emits_error_event() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(ScriptedMessages::new().fail(AgentError::Api {
            status: 529,
            body: "overloaded".to_string(),
        }));
        let agent = agent(api, &dir, 5);

        let events = collect(&agent, vec![UiMessage::text(Role::User, "hello")]).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AgentEvent::Error { message } if message.contains("overloaded")));
    }

    #[tokio::test]
    async fn test_history_without_text_rejected() {
        let dir = TempDir::new().unwrap();
        let agent = agent(Arc::new(ScriptedMessages::new()), &dir, 5);
        let result = agent.respond(vec![UiMessage::text(Role::System, "only system")]).await;
        assert!(matches!(result, Err(AgentError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_scripted_agent_records_history() {
        let agent = ScriptedAgent::new(vec![AgentEvent::TextDelta {
            text: "ok".to_string(),
        }]);
        let history = vec![UiMessage::text(Role::User, "hi")];
        let events: Vec<AgentEvent> = agent.respond(history.clone()).await.unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(agent.histories(), vec![history]);
    }
}
