//! Interviewer reply markup: `<speech>` to be spoken, `<screen>` for the whiteboard.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::status::ConversationStatus;

static SPEECH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<speech>(.*?)</speech>").expect("valid regex"));
static SCREEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<screen>(.*?)</screen>").expect("valid regex"));

/// What to say, and optionally how to say it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCue {
    pub text: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpeechJson {
    #[serde(default)]
    speech: String,
    #[serde(default)]
    instructions: String,
}

impl SpeechCue {
    /// Parse the inside of a `<speech>` tag: plain text, or
    /// `{"speech": "...", "instructions": "..."}`.
    pub fn parse(inner: &str) -> Self {
        let inner = inner.trim();
        match serde_json::from_str::<SpeechJson>(inner) {
            Ok(json) if !json.speech.is_empty() => SpeechCue {
                text: json.speech,
                instructions: Some(json.instructions).filter(|i| !i.is_empty()),
            },
            _ => SpeechCue {
                text: inner.to_string(),
                instructions: None,
            },
        }
    }
}

/// First `<speech>` and `<screen>` blocks of an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantMarkup {
    pub speech: Option<SpeechCue>,
    pub screen: Option<String>,
}

impl AssistantMarkup {
    /// Unclosed tags (still streaming) are not matched.
    pub fn parse(content: &str) -> Self {
        Self {
            speech: SPEECH_RE
                .captures(content)
                .map(|c| SpeechCue::parse(&c[1])),
            screen: SCREEN_RE.captures(content).map(|c| c[1].trim().to_string()),
        }
    }
}

/// What the room should do after an assistant message changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupUpdate {
    /// New whiteboard content, updated on every change.
    pub screen: Option<String>,
    /// Speech to play; set at most once per message id.
    pub speak: Option<SpeechCue>,
}

/// Tracks which assistant messages have already been spoken.
#[derive(Debug, Clone, Default)]
pub struct MarkupTracker {
    spoken: HashSet<String>,
}

impl MarkupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the latest assistant message.
    ///
    /// Speech is released only once the response has finished streaming, and
    /// only the first time a given message id finishes.
    pub fn on_message(&mut self, id: &str, content: &str, status: ConversationStatus) -> MarkupUpdate {
        let markup = AssistantMarkup::parse(content);
        let mut update = MarkupUpdate {
            screen: markup.screen,
            speak: None,
        };

        if status != ConversationStatus::Streaming && self.spoken.insert(id.to_string()) {
            update.speak = markup.speech.filter(|cue| !cue.text.is_empty());
        }
        update
    }
}
