//! Background answer verification for the interview agent.
//!
//! A question is handed to [`VerificationDispatcher::dispatch`], which returns an id
//! immediately and checks the question on a detached task. Every dispatch deposits
//! exactly one [`VerificationResult`] into the shared [`Mailbox`]. At the start of
//! each conversation turn [`merge_turn`] drains the mailbox and appends one
//! synthetic assistant message per result to the caller's history.

pub mod dispatcher;
pub mod error;
pub mod lookup;
pub mod mailbox;
pub mod result;
pub mod turn;

pub use dispatcher::VerificationDispatcher;
pub use error::VerifyError;
pub use lookup::{KnowledgeLookup, ScriptedLookup};
pub use mailbox::Mailbox;
pub use result::{parse_verdict, Verdict, VerificationRequest, VerificationResult};
pub use turn::{merge_turn, render_result};
