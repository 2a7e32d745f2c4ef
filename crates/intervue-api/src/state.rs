//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use intervue_agent::ConversationAgent;
use intervue_core::config::IntervueConfig;
use intervue_verify::{Mailbox, VerificationDispatcher};
use intervue_voice::{SpeechService, TranscriptionService};

/// Shared application state.
///
/// Services are held behind trait objects so tests can swap in mocks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IntervueConfig>,
    /// Results of background verifications, drained at the start of each chat turn.
    pub mailbox: Mailbox,
    pub dispatcher: Arc<VerificationDispatcher>,
    pub agent: Arc<dyn ConversationAgent>,
    pub transcriber: Arc<dyn TranscriptionService>,
    pub speech: Arc<dyn SpeechService>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// The mailbox is taken from the dispatcher so both sides share one buffer.
    pub fn new(
        config: IntervueConfig,
        dispatcher: Arc<VerificationDispatcher>,
        agent: Arc<dyn ConversationAgent>,
        transcriber: Arc<dyn TranscriptionService>,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            mailbox: dispatcher.mailbox().clone(),
            dispatcher,
            agent,
            transcriber,
            speech,
            start_time: Instant::now(),
        }
    }
}
