//! Utterances held back while the interviewer is still answering.

use chrono::{DateTime, Local};
use intervue_core::config::RoomConfig;

/// How a transcript is written into the outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UtteranceFormat {
    /// `[<local time>] text`
    #[default]
    Timestamped,
    Plain,
}

impl From<&RoomConfig> for UtteranceFormat {
    fn from(config: &RoomConfig) -> Self {
        if config.stamp_utterances {
            UtteranceFormat::Timestamped
        } else {
            UtteranceFormat::Plain
        }
    }
}

impl UtteranceFormat {
    pub fn render(&self, text: &str, at: DateTime<Local>) -> String {
        match self {
            UtteranceFormat::Timestamped => {
                format!("[{}] {}", at.format("%a %b %d %Y %H:%M:%S GMT%z"), text)
            }
            UtteranceFormat::Plain => text.to_string(),
        }
    }
}

/// FIFO of rendered utterances waiting for the next idle transition.
#[derive(Debug, Clone, Default)]
pub struct PendingUtteranceQueue {
    items: Vec<String>,
}

impl PendingUtteranceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, utterance: String) {
        self.items.push(utterance);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empty the queue and join its contents with single spaces.
    ///
    /// Returns `None` when the merged text is blank.
    pub fn take_merged(&mut self) -> Option<String> {
        let merged = std::mem::take(&mut self.items).join(" ");
        if merged.trim().is_empty() {
            None
        } else {
            Some(merged)
        }
    }
}
