//! Conversation status and the processing -> idle edge detector.

use serde::{Deserialize, Serialize};

/// Where the chat request currently is, as reported by the chat client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Request sent, no response yet.
    Submitted,
    /// Response is streaming in.
    Streaming,
    /// Idle, last turn completed.
    Ready,
    /// Idle, last turn failed.
    Error,
}

impl ConversationStatus {
    pub fn is_processing(&self) -> bool {
        matches!(self, ConversationStatus::Submitted | ConversationStatus::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherAction {
    /// Merge and send everything queued while the interviewer was busy.
    FlushQueue,
}

/// Remembers the previous status and reports the processing -> idle edge.
#[derive(Debug, Clone)]
pub struct StatusWatcher {
    previous: ConversationStatus,
}

impl Default for StatusWatcher {
    fn default() -> Self {
        Self {
            previous: ConversationStatus::Ready,
        }
    }
}

impl StatusWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> ConversationStatus {
        self.previous
    }

    /// Record `status` and return `FlushQueue` exactly on a processing -> idle edge.
    pub fn observe(&mut self, status: ConversationStatus) -> Option<WatcherAction> {
        let was_processing = self.previous.is_processing();
        self.previous = status;
        (was_processing && !status.is_processing()).then_some(WatcherAction::FlushQueue)
    }
}
