//! Knowledge-source abstraction used by the dispatcher.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::VerifyError;

/// Something that can answer a question with free text.
///
/// The dispatcher treats the source as a black box and parses the returned text
/// as a [`crate::Verdict`]. Implementations enforce their own step budget.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    async fn lookup(&self, question: &str) -> Result<String, VerifyError>;
}

/// Canned replies keyed by question, with an optional delay per question.
///
/// Used for tests and offline development. Unknown questions yield a lookup error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLookup {
    replies: HashMap<String, (Duration, Result<String, VerifyError>)>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `question` with `text` after `delay`.
    pub fn reply(mut self, question: &str, delay: Duration, text: &str) -> Self {
        self.replies
            .insert(question.to_string(), (delay, Ok(text.to_string())));
        self
    }

    /// Fail `question` with `error` after `delay`.
    pub fn fail(mut self, question: &str, delay: Duration, error: VerifyError) -> Self {
        self.replies
            .insert(question.to_string(), (delay, Err(error)));
        self
    }
}

#[async_trait]
impl KnowledgeLookup for ScriptedLookup {
    async fn lookup(&self, question: &str) -> Result<String, VerifyError> {
        match self.replies.get(question) {
            Some((delay, reply)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                reply.clone()
            }
            None => Err(VerifyError::Lookup(format!(
                "no scripted reply for: {}",
                question
            ))),
        }
    }
}
