//! Shared append/drain buffer for verification results.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::result::VerificationResult;

/// Process-wide, in-memory buffer of finished verifications.
///
/// Cloning shares the underlying buffer. Entries are appended by background
/// tasks and removed only by [`Mailbox::drain`]. Each operation holds the lock
/// for one step with no await inside, so a drain partitions the append stream:
/// every entry is delivered by exactly one drain.
///
/// The mailbox is not keyed by interview session.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    entries: Arc<Mutex<Vec<VerificationResult>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one finished verification.
    pub fn push(&self, result: VerificationResult) {
        self.lock().push(result);
    }

    /// Take every entry and leave the mailbox empty.
    pub fn drain(&self) -> Vec<VerificationResult> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of results waiting for the next turn.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic elsewhere never leaves the Vec half-written, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<VerificationResult>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn failure(error: &str) -> VerificationResult {
        VerificationResult::Failure {
            id: Uuid::new_v4(),
            error: error.to_string(),
        }
    }

    #[test]
    fn test_new_mailbox_is_empty() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_drain_takes_all_and_clears() {
        let mailbox = Mailbox::new();
        mailbox.push(failure("a"));
        mailbox.push(failure("b"));
        assert_eq!(mailbox.len(), 2);

        let drained = mailbox.drain();
        assert_eq!(drained.len(), 2);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_consecutive_drains_do_not_overlap() {
        let mailbox = Mailbox::new();
        let first = failure("first");
        mailbox.push(first.clone());
        let drained_1 = mailbox.drain();

        let second = failure("second");
        mailbox.push(second.clone());
        let drained_2 = mailbox.drain();

        assert_eq!(drained_1, vec![first]);
        assert_eq!(drained_2, vec![second]);
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_clone_shares_buffer() {
        let producer = Mailbox::new();
        let consumer = producer.clone();
        producer.push(failure("shared"));
        assert_eq!(consumer.drain().len(), 1);
        assert!(producer.is_empty());
    }

    #[test]
    fn test_concurrent_push_and_drain_delivers_each_entry_once() {
        let mailbox = Mailbox::new();
        let producers: Vec<_> = (0..8)
            .map(|_| {
                let mb = mailbox.clone();
                std::thread::spawn(move || {
                    let mut ids = Vec::new();
                    for _ in 0..250 {
                        let entry = failure("x");
                        ids.push(entry.id());
                        mb.push(entry);
                    }
                    ids
                })
            })
            .collect();

        let mut delivered = Vec::new();
        while producers.iter().any(|h| !h.is_finished()) {
            delivered.extend(mailbox.drain());
        }
        let pushed: HashSet<Uuid> = producers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        delivered.extend(mailbox.drain());

        let delivered_ids: Vec<Uuid> = delivered.iter().map(|r| r.id()).collect();
        let unique: HashSet<Uuid> = delivered_ids.iter().copied().collect();
        assert_eq!(delivered_ids.len(), 2000);
        assert_eq!(unique, pushed);
    }

    #[test]
    fn test_poisoned_lock_still_drains() {
        let mailbox = Mailbox::new();
        mailbox.push(failure("before panic"));

        let mb = mailbox.clone();
        let _ = std::thread::spawn(move || {
            let _guard = mb.entries.lock().unwrap();
            panic!("poison the mailbox");
        })
        .join();

        assert_eq!(mailbox.drain().len(), 1);
    }
}
