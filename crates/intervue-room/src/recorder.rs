//! Push-to-talk recorder states.
//!
//! - Idle -> Recording (press)
//! - Recording -> Transcribing (release)
//! - Transcribing -> Idle (transcript handled)
//! - Recording -> Idle (capture failed)

use std::fmt;

use crate::error::RoomError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecorderState {
    /// Not recording. A press starts a new clip.
    Idle,
    /// Microphone capture in progress.
    Recording,
    /// Clip captured and being turned into text.
    Transcribing,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "Idle"),
            RecorderState::Recording => write!(f, "Recording"),
            RecorderState::Transcribing => write!(f, "Transcribing"),
        }
    }
}

impl RecorderState {
    pub fn can_transition_to(&self, target: &RecorderState) -> bool {
        matches!(
            (self, target),
            (RecorderState::Idle, RecorderState::Recording)
                | (RecorderState::Recording, RecorderState::Transcribing)
                | (RecorderState::Transcribing, RecorderState::Idle)
                // Speak again while the last clip is still in flight
                | (RecorderState::Transcribing, RecorderState::Recording)
                // Cancel
                | (RecorderState::Recording, RecorderState::Idle)
        )
    }

    /// Validated transition.
    pub fn transition(&mut self, target: RecorderState) -> Result<(), RoomError> {
        if !self.can_transition_to(&target) {
            return Err(RoomError::InvalidTransition {
                from: *self,
                to: target,
            });
        }
        tracing::debug!("Recorder state: {} -> {}", self, target);
        *self = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(RecorderState::Idle.can_transition_to(&RecorderState::Recording));
        assert!(RecorderState::Recording.can_transition_to(&RecorderState::Transcribing));
        assert!(RecorderState::Transcribing.can_transition_to(&RecorderState::Idle));
        assert!(RecorderState::Recording.can_transition_to(&RecorderState::Idle));
        assert!(RecorderState::Transcribing.can_transition_to(&RecorderState::Recording));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!RecorderState::Idle.can_transition_to(&RecorderState::Transcribing));
        assert!(!RecorderState::Idle.can_transition_to(&RecorderState::Idle));
        assert!(!RecorderState::Recording.can_transition_to(&RecorderState::Recording));
    }

    #[test]
    fn test_transition_applies_or_rejects() {
        let mut state = RecorderState::Idle;
        state.transition(RecorderState::Recording).unwrap();
        state.transition(RecorderState::Transcribing).unwrap();
        assert!(state.transition(RecorderState::Transcribing).is_err());
        assert_eq!(state, RecorderState::Transcribing);
        state.transition(RecorderState::Idle).unwrap();
        assert_eq!(state, RecorderState::Idle);
    }
}
