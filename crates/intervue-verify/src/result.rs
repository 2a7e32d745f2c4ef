//! Verification requests, verdicts, and mailbox records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VerifyError;

/// A question queued for background checking. The id is the caller's only handle.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub question: String,
}

impl VerificationRequest {
    pub fn new(question: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
        }
    }
}

/// Structured answer the checker model must return.
///
/// `confidence` is in [-1, 1]; -1 means no answer could be found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub confidence: f64,
    pub reason: String,
    pub answer: String,
}

/// Outcome of one background verification. Never modified after creation.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Success {
        id: Uuid,
        confidence: f64,
        reason: String,
        answer: String,
    },
    Failure {
        id: Uuid,
        error: String,
    },
}

impl VerificationResult {
    /// Build the mailbox record for a finished verification.
    pub fn from_outcome(id: Uuid, outcome: Result<Verdict, VerifyError>) -> Self {
        match outcome {
            Ok(verdict) => VerificationResult::Success {
                id,
                confidence: verdict.confidence,
                reason: verdict.reason,
                answer: verdict.answer,
            },
            Err(e) => VerificationResult::Failure {
                id,
                error: e.to_string(),
            },
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            VerificationResult::Success { id, .. } | VerificationResult::Failure { id, .. } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success { .. })
    }
}

/// Parse the checker's final text as a [`Verdict`].
///
/// The text must be exactly one JSON object (surrounding whitespace allowed).
pub fn parse_verdict(text: &str) -> Result<Verdict, VerifyError> {
    let verdict: Verdict = serde_json::from_str(text.trim())
        .map_err(|e| VerifyError::MalformedVerdict(e.to_string()))?;

    if !(-1.0..=1.0).contains(&verdict.confidence) {
        return Err(VerifyError::ConfidenceOutOfRange(verdict.confidence));
    }

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_verdict_valid() {
        let verdict = parse_verdict(
            r#"{ "confidence": 1, "reason": "The capital of France is Paris.", "answer": "Paris" }"#,
        )
        .unwrap();
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.answer, "Paris");
    }

    #[test]
    fn test_parse_verdict_trims_whitespace() {
        let verdict =
            parse_verdict("\n  {\"confidence\": 0.4, \"reason\": \"r\", \"answer\": \"a\"}\n")
                .unwrap();
        assert_eq!(verdict.confidence, 0.4);
    }

    #[test]
    fn test_parse_verdict_not_found_is_minus_one() {
        let verdict =
            parse_verdict(r#"{"confidence": -1, "reason": "nothing found", "answer": ""}"#)
                .unwrap();
        assert_eq!(verdict.confidence, -1.0);
    }

    #[test]
    fn test_parse_verdict_rejects_prose() {
        let err = parse_verdict("The answer is Paris.").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedVerdict(_)));
    }

    #[test]
    fn test_parse_verdict_rejects_code_fence() {
        let err = parse_verdict("```json\n{\"confidence\": 1, \"reason\": \"r\", \"answer\": \"a\"}\n```")
            .unwrap_err();
        assert!(matches!(err, VerifyError::MalformedVerdict(_)));
    }

    #[test]
    fn test_parse_verdict_rejects_missing_field() {
        let err = parse_verdict(r#"{"confidence": 0.5, "answer": "a"}"#).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedVerdict(_)));
    }

    #[test]
    fn test_parse_verdict_rejects_out_of_range_confidence() {
        let err = parse_verdict(r#"{"confidence": 7, "reason": "r", "answer": "a"}"#).unwrap_err();
        assert_eq!(err, VerifyError::ConfidenceOutOfRange(7.0));
    }

    #[test]
    fn test_from_outcome() {
        let id = Uuid::new_v4();
        let ok = VerificationResult::from_outcome(
            id,
            Ok(Verdict {
                confidence: 0.9,
                reason: "r1".to_string(),
                answer: "Paris".to_string(),
            }),
        );
        assert!(ok.is_success());
        assert_eq!(ok.id(), id);

        let failed =
            VerificationResult::from_outcome(id, Err(VerifyError::Timeout(Duration::from_secs(3))));
        assert_eq!(
            failed,
            VerificationResult::Failure {
                id,
                error: "verification timed out after 3s".to_string(),
            }
        );
    }
}
