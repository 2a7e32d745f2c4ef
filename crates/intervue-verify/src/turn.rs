//! Per-turn merge of finished verifications into the conversation history.

use intervue_core::types::{Role, UiMessage};

use crate::mailbox::Mailbox;
use crate::result::VerificationResult;

/// Render a result as the text of a synthetic assistant message.
pub fn render_result(result: &VerificationResult) -> String {
    match result {
        VerificationResult::Success {
            id,
            confidence,
            reason,
            answer,
        } => format!(
            "Authenticity verification result: ID: {}\nConfidence: {}\nReason: {}\nAnswer: {}",
            id, confidence, reason, answer
        ),
        VerificationResult::Failure { id, error } => format!(
            "Authenticity verification error: ID: {}\nError: {}",
            id, error
        ),
    }
}

/// Drain the mailbox and append one synthetic assistant message per result.
///
/// Results appear after the caller's history in drain order. Anything pushed
/// after the drain is left for the next turn. An empty mailbox returns the
/// history untouched.
pub fn merge_turn(mut history: Vec<UiMessage>, mailbox: &Mailbox) -> Vec<UiMessage> {
    let drained = mailbox.drain();
    if drained.is_empty() {
        return history;
    }

    tracing::info!(count = drained.len(), "Merging verification results into turn");
    history.extend(
        drained
            .iter()
            .map(|result| UiMessage::text(Role::Assistant, render_result(result))),
    );
    history
}
