//! Web-backed knowledge lookup for background verification.

use std::sync::Arc;

use async_trait::async_trait;
use intervue_core::config::VerificationConfig;
use intervue_verify::{KnowledgeLookup, VerifyError};
use serde_json::json;

use crate::messages::{ApiMessage, ContentBlock, MessagesApi, MessagesRequest, MessagesResponse, StopReason};

const CHECKER_SYSTEM_PROMPT: &str = r#"You're a senior authenticity checker in an interview. Check the accuracy of the question the interviewer gives you and output the answer in JSON format.
The answer must be in the following JSON format: { "confidence": number, "reason": string, "answer": string }. The confidence should be between 0 and 1. The reason should be a short explanation of the answer. The answer should be the answer to the question. If you can't find the answer, make confidence -1. The JSON must be valid and well-formed.
You can use the web_search and web_fetch tools to search the internet for the answer.
Here's an example of the answer and the question:
<example>
<question>What is the capital of France?</question>
<answer>{ "confidence": 1, "reason": "The capital of France is Paris.", "answer": "Paris" }</answer>
</example>"#;

const ANSWER_INSTRUCTION: &str = "Now, find out the answer and give me the answer in JSON format directly. \
Don't include any other text in your response. Don't include markdown code block in your response.";

/// Answers verification questions with a small model and hosted web tools.
///
/// Each call is bounded by `max_steps` model calls; a paused turn (the hosted
/// search still running) consumes a step and is resumed.
pub struct HostedLookup {
    api: Arc<dyn MessagesApi>,
    model: String,
    max_steps: u32,
    max_search_uses: u32,
    max_tokens: u32,
}

impl HostedLookup {
    pub fn new(api: Arc<dyn MessagesApi>, config: &VerificationConfig) -> Self {
        Self {
            api,
            model: config.model.clone(),
            max_steps: config.max_steps.max(1),
            max_search_uses: config.max_search_uses,
            max_tokens: config.max_tokens,
        }
    }

    fn tools(&self) -> Vec<serde_json::Value> {
        vec![
            json!({"type": "web_search_20250305", "name": "web_search", "max_uses": self.max_search_uses}),
            json!({"type": "web_fetch_20250910", "name": "web_fetch", "max_uses": self.max_search_uses}),
        ]
    }
}

#[async_trait]
impl KnowledgeLookup for HostedLookup {
    async fn lookup(&self, question: &str) -> Result<String, VerifyError> {
        let mut messages = vec![ApiMessage::user(vec![ContentBlock::text(format!(
            "{}\n{}",
            question, ANSWER_INSTRUCTION
        ))])];

        for step in 1..=self.max_steps {
            let request = MessagesRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                system: Some(CHECKER_SYSTEM_PROMPT.to_string()),
                messages: messages.clone(),
                tools: self.tools(),
            };
            let response = self
                .api
                .create(&request)
                .await
                .map_err(|e| VerifyError::Lookup(e.to_string()))?;

            if response.stop_reason == Some(StopReason::PauseTurn) {
                tracing::debug!(step, "Verification paused by hosted tool; resuming");
                messages.push(ApiMessage::assistant(response.content));
                continue;
            }
            return Ok(final_text(&response));
        }

        Err(VerifyError::Lookup(format!(
            "step budget of {} exhausted",
            self.max_steps
        )))
    }
}

/// Text written after the last non-text block (search calls and their results).
fn final_text(response: &MessagesResponse) -> String {
    let mut text = String::new();
    for block in &response.content {
        match block.as_text() {
            Some(t) => text.push_str(t),
            None => text.clear(),
        }
    }
    text
}
