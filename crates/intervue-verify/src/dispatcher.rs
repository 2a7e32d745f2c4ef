//! Fire-and-forget dispatcher for background verifications.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::error::VerifyError;
use crate::lookup::KnowledgeLookup;
use crate::mailbox::Mailbox;
use crate::result::{parse_verdict, Verdict, VerificationRequest, VerificationResult};

/// Spawns one detached verification task per question.
///
/// Each task ends with exactly one [`Mailbox::push`], whether the lookup
/// succeeds, fails, times out, returns malformed output, or panics. Tasks are
/// not cancellable; they are tracked only so shutdown can optionally wait for
/// them.
pub struct VerificationDispatcher {
    lookup: Arc<dyn KnowledgeLookup>,
    mailbox: Mailbox,
    tracker: TaskTracker,
    timeout: Duration,
}

impl VerificationDispatcher {
    pub fn new(lookup: Arc<dyn KnowledgeLookup>, mailbox: Mailbox, timeout: Duration) -> Self {
        Self {
            lookup,
            mailbox,
            tracker: TaskTracker::new(),
            timeout,
        }
    }

    /// The mailbox results are delivered to.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Number of verifications still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start checking `question` in the background and return its id at once.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, question: impl Into<String>) -> Uuid {
        let request = VerificationRequest::new(question.into());
        let id = request.id;
        let lookup = Arc::clone(&self.lookup);
        let mailbox = self.mailbox.clone();
        let timeout = self.timeout;

        tracing::info!(id = %id, question = %request.question, "Verification dispatched");

        self.tracker.spawn(async move {
            let outcome = AssertUnwindSafe(verify(lookup.as_ref(), &request.question, timeout))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(VerifyError::Panicked(panic_message(&*panic))));

            match &outcome {
                Ok(verdict) => tracing::info!(
                    id = %id,
                    confidence = verdict.confidence,
                    "Verification completed"
                ),
                Err(e) => tracing::warn!(id = %id, error = %e, "Verification failed"),
            }

            mailbox.push(VerificationResult::from_outcome(id, outcome));
        });

        id
    }

    /// Close the task tracker and wait up to `grace` for running verifications.
    ///
    /// Returns `true` when nothing was left running. A zero grace abandons
    /// in-flight verifications immediately; their results are lost with the process.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();

        let finished = if grace.is_zero() {
            self.tracker.is_empty()
        } else {
            tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
        };

        if !finished {
            tracing::warn!(
                abandoned = self.tracker.len(),
                "Abandoning in-flight verifications at shutdown"
            );
        }
        finished
    }
}

async fn verify(
    lookup: &dyn KnowledgeLookup,
    question: &str,
    timeout: Duration,
) -> Result<Verdict, VerifyError> {
    let text = tokio::time::timeout(timeout, lookup.lookup(question))
        .await
        .map_err(|_| VerifyError::Timeout(timeout))??;

    tracing::debug!(text_len = text.len(), "Verification lookup returned");
    parse_verdict(&text)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::ScriptedLookup;
    use async_trait::async_trait;

    const PARIS: &str = r#"{"confidence": 0.9, "reason": "r1", "answer": "Paris"}"#;
    const BERLIN: &str = r#"{"confidence": 1, "reason": "capital", "answer": "Berlin"}"#;

    fn dispatcher(lookup: impl KnowledgeLookup + 'static, timeout: Duration) -> VerificationDispatcher {
        VerificationDispatcher::new(Arc::new(lookup), Mailbox::new(), timeout)
    }

    async fn settle(d: &VerificationDispatcher) {
        assert!(d.shutdown(Duration::from_secs(5)).await, "tasks did not finish");
    }

    struct PanickingLookup;

    #[async_trait]
    impl KnowledgeLookup for PanickingLookup {
        async fn lookup(&self, _question: &str) -> Result<String, VerifyError> {
            panic!("search backend exploded");
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_immediately() {
        let d = dispatcher(
            ScriptedLookup::new().reply("slow", Duration::from_secs(2), PARIS),
            Duration::from_secs(10),
        );
        let started = std::time::Instant::now();
        let _id = d.dispatch("slow");
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(d.mailbox().is_empty());
        assert_eq!(d.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_success_appends_one_result() {
        let d = dispatcher(
            ScriptedLookup::new().reply("capital of France?", Duration::ZERO, PARIS),
            Duration::from_secs(5),
        );
        let id = d.dispatch("capital of France?");
        settle(&d).await;

        let drained = d.mailbox().drain();
        assert_eq!(
            drained,
            vec![VerificationResult::Success {
                id,
                confidence: 0.9,
                reason: "r1".to_string(),
                answer: "Paris".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_lookup_error_appends_failure() {
        let d = dispatcher(
            ScriptedLookup::new().fail(
                "q",
                Duration::ZERO,
                VerifyError::Lookup("HTTP 529: overloaded".to_string()),
            ),
            Duration::from_secs(5),
        );
        let id = d.dispatch("q");
        settle(&d).await;

        let drained = d.mailbox().drain();
        assert_eq!(drained.len(), 1);
        match &drained[0] {
            VerificationResult::Failure { id: got, error } => {
                assert_eq!(*got, id);
                assert!(error.contains("overloaded"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_output_appends_failure() {
        let d = dispatcher(
            ScriptedLookup::new().reply("q", Duration::ZERO, "Sure! The answer is Paris."),
            Duration::from_secs(5),
        );
        d.dispatch("q");
        settle(&d).await;

        let drained = d.mailbox().drain();
        assert_eq!(drained.len(), 1);
        assert!(!drained[0].is_success());
    }

    #[tokio::test]
    async fn test_timeout_appends_failure() {
        let d = dispatcher(
            ScriptedLookup::new().reply("q", Duration::from_secs(30), PARIS),
            Duration::from_millis(50),
        );
        d.dispatch("q");
        settle(&d).await;

        let drained = d.mailbox().drain();
        assert_eq!(drained.len(), 1);
        match &drained[0] {
            VerificationResult::Failure { error, .. } => {
                assert_eq!(error, "verification timed out after 50ms")
            }
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained_as_failure() {
        let d = dispatcher(PanickingLookup, Duration::from_secs(5));
        let id = d.dispatch("boom");
        settle(&d).await;

        let drained = d.mailbox().drain();
        assert_eq!(drained.len(), 1);
        match &drained[0] {
            VerificationResult::Failure { id: got, error } => {
                assert_eq!(*got, id);
                assert!(error.contains("search backend exploded"));
            }
            other => panic!("expected panic failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_one_entry_each_regardless_of_order() {
        let d = dispatcher(
            ScriptedLookup::new()
                .reply("slow", Duration::from_millis(150), PARIS)
                .reply("fast", Duration::ZERO, BERLIN),
            Duration::from_secs(5),
        );
        let slow = d.dispatch("slow");
        let fast = d.dispatch("fast");
        assert_ne!(slow, fast);
        settle(&d).await;

        let drained = d.mailbox().drain();
        let ids: Vec<Uuid> = drained.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&slow));
        assert!(ids.contains(&fast));
        // The fast one finishes first even though it was dispatched second.
        assert_eq!(ids[0], fast);
    }

    #[tokio::test]
    async fn test_many_dispatches_no_loss_no_duplication() {
        let mut lookup = ScriptedLookup::new();
        for i in 0..20 {
            lookup = lookup.reply(&format!("q{}", i), Duration::from_millis((i % 5) * 10), PARIS);
        }
        let d = dispatcher(lookup, Duration::from_secs(5));
        let mut ids: Vec<Uuid> = (0..20).map(|i| d.dispatch(format!("q{}", i))).collect();
        settle(&d).await;

        let mut drained: Vec<Uuid> = d.mailbox().drain().iter().map(|r| r.id()).collect();
        ids.sort();
        drained.sort();
        assert_eq!(ids, drained);
    }

    #[tokio::test]
    async fn test_drain_before_completion_defers_to_next_drain() {
        let d = dispatcher(
            ScriptedLookup::new()
                .reply("early", Duration::ZERO, PARIS)
                .reply("late", Duration::from_millis(200), BERLIN),
            Duration::from_secs(5),
        );
        let early = d.dispatch("early");
        let late = d.dispatch("late");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let first: Vec<Uuid> = d.mailbox().drain().iter().map(|r| r.id()).collect();
        assert_eq!(first, vec![early]);

        settle(&d).await;
        let second: Vec<Uuid> = d.mailbox().drain().iter().map(|r| r.id()).collect();
        assert_eq!(second, vec![late]);
    }

    #[tokio::test]
    async fn test_shutdown_zero_grace_abandons() {
        let d = dispatcher(
            ScriptedLookup::new().reply("slow", Duration::from_secs(30), PARIS),
            Duration::from_secs(60),
        );
        d.dispatch("slow");
        assert!(!d.shutdown(Duration::ZERO).await);
        assert!(d.mailbox().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_with_nothing_running() {
        let d = dispatcher(ScriptedLookup::new(), Duration::from_secs(1));
        assert!(d.shutdown(Duration::ZERO).await);
    }
}
