use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IntervueError, Result};

// =============================================================================
// Conversation messages
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One part of a conversation message as exchanged with the browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    Text { text: String },
    /// Any part kind the server does not interpret (tool traces, step markers).
    #[serde(other)]
    Other,
}

/// A conversation message in the shape the chat endpoint accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<UiPart>,
}

impl UiMessage {
    /// A single-part text message with a fresh id.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts: vec![UiPart::Text { text: text.into() }],
        }
    }

    /// Concatenated text of all text parts.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                UiPart::Text { text } => Some(text.as_str()),
                UiPart::Other => None,
            })
            .collect()
    }
}

/// Check a conversation history before it is handed to the agent.
///
/// A valid history is non-empty and every message has an id.
///
/// Messages made only of non-text parts (tool traces, step markers) are
/// accepted; they carry nothing for the model and are skipped downstream.
pub fn validate_messages(messages: &[UiMessage]) -> Result<()> {
    if messages.is_empty() {
        return Err(IntervueError::InvalidHistory(
            "messages must not be empty".to_string(),
        ));
    }

    for (index, message) in messages.iter().enumerate() {
        if message.id.trim().is_empty() {
            return Err(IntervueError::InvalidHistory(format!(
                "message {} has an empty id",
                index
            )));
        }
    }

    Ok(())
}
