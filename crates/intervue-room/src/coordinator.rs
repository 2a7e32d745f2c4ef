//! Push-to-talk coordinator.
//!
//! A synchronous state machine: inputs are gestures, capture/transcription
//! outcomes and conversation status changes; outputs are [`Effect`]s for the
//! driver to execute. Nothing here blocks or performs I/O.

use chrono::{DateTime, Local};

use crate::error::RoomError;
use crate::queue::{PendingUtteranceQueue, UtteranceFormat};
use crate::recorder::RecorderState;
use crate::status::{ConversationStatus, StatusWatcher, WatcherAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Space,
    Other,
}

/// Element that had focus when a key event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Input,
    TextArea,
    ContentEditable,
    Other,
}

impl FocusTarget {
    /// Whether typing into this element must not trigger push-to-talk.
    pub fn accepts_text(&self) -> bool {
        matches!(
            self,
            FocusTarget::Input | FocusTarget::TextArea | FocusTarget::ContentEditable
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    PointerDown,
    PointerUp,
    TouchStart,
    TouchEnd,
    KeyDown {
        code: KeyCode,
        target: FocusTarget,
        repeat: bool,
    },
    KeyUp {
        code: KeyCode,
        target: FocusTarget,
    },
}

impl Gesture {
    fn is_press(&self) -> bool {
        match self {
            Gesture::PointerDown | Gesture::TouchStart => true,
            Gesture::KeyDown { code, target, repeat } => {
                *code == KeyCode::Space && !target.accepts_text() && !repeat
            }
            _ => false,
        }
    }

    fn is_release(&self) -> bool {
        match self {
            Gesture::PointerUp | Gesture::TouchEnd => true,
            Gesture::KeyUp { code, target } => *code == KeyCode::Space && !target.accepts_text(),
            _ => false,
        }
    }
}

/// Work the driver must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Cut off interviewer audio that is still playing.
    StopPlayback,
    StartCapture,
    /// Stop the microphone and report the clip via [`PushToTalk::captured`].
    StopCapture,
    /// Transcribe the clip and report via [`PushToTalk::transcribed`].
    Transcribe(Vec<u8>),
    /// Send a user message to the interviewer.
    Send(String),
}

#[derive(Debug, Clone)]
pub struct PushToTalk {
    recorder: RecorderState,
    /// Released clips not yet captured or transcribed.
    in_flight: usize,
    status: ConversationStatus,
    watcher: StatusWatcher,
    queue: PendingUtteranceQueue,
    format: UtteranceFormat,
}

impl Default for PushToTalk {
    fn default() -> Self {
        Self::new(UtteranceFormat::default())
    }
}

impl PushToTalk {
    pub fn new(format: UtteranceFormat) -> Self {
        Self {
            recorder: RecorderState::Idle,
            in_flight: 0,
            status: ConversationStatus::Ready,
            watcher: StatusWatcher::new(),
            queue: PendingUtteranceQueue::new(),
            format,
        }
    }

    pub fn recorder(&self) -> RecorderState {
        self.recorder
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn queue(&self) -> &PendingUtteranceQueue {
        &self.queue
    }

    /// Handle a press or release. Unrelated gestures and key auto-repeat yield nothing.
    ///
    /// A press is accepted while an earlier clip is still being transcribed.
    pub fn gesture(&mut self, gesture: Gesture) -> Vec<Effect> {
        if gesture.is_press() {
            if self.recorder.transition(RecorderState::Recording).is_err() {
                tracing::debug!(state = %self.recorder, "Press ignored");
                return Vec::new();
            }
            return vec![Effect::StopPlayback, Effect::StartCapture];
        }

        if gesture.is_release() {
            if self.recorder != RecorderState::Recording {
                return Vec::new();
            }
            return match self.recorder.transition(RecorderState::Transcribing) {
                Ok(()) => {
                    self.in_flight += 1;
                    vec![Effect::StopCapture]
                }
                Err(_) => Vec::new(),
            };
        }

        Vec::new()
    }

    /// Microphone could not start or stop; drop the clip.
    pub fn capture_failed(&mut self, error: &RoomError) {
        tracing::warn!(error = %error, "Audio capture failed");
        if self.recorder == RecorderState::Recording {
            self.recorder = RecorderState::Idle;
        } else {
            self.clip_done();
        }
    }

    /// One released clip finished, successfully or not.
    fn clip_done(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 && self.recorder == RecorderState::Transcribing {
            self.recorder = RecorderState::Idle;
        }
    }

    /// The clip captured after a release.
    pub fn captured(&mut self, audio: Vec<u8>) -> Vec<Effect> {
        if self.in_flight == 0 {
            tracing::debug!(state = %self.recorder, "Unexpected captured clip ignored");
            return Vec::new();
        }
        if audio.is_empty() {
            tracing::warn!(error = %RoomError::NoAudio, "Dropping recording");
            self.clip_done();
            return Vec::new();
        }
        vec![Effect::Transcribe(audio)]
    }

    /// Outcome of transcribing the last clip.
    ///
    /// Failures and blank text leave the queue untouched and send nothing.
    /// Otherwise the rendered utterance is queued while the interviewer is
    /// busy, or sent at once.
    pub fn transcribed(&mut self, outcome: Result<String, RoomError>, at: DateTime<Local>) -> Vec<Effect> {
        self.clip_done();

        let text = match outcome {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(error = %RoomError::BlankTranscript, "Dropping recording");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping recording");
                return Vec::new();
            }
        };

        let utterance = self.format.render(text.trim(), at);
        if self.status.is_processing() {
            self.queue.push(utterance);
            tracing::info!(queued = self.queue.len(), "Utterance queued while interviewer is busy");
            Vec::new()
        } else {
            vec![Effect::Send(utterance)]
        }
    }

    /// Track the chat client's status; flush the queue on the processing -> idle edge.
    pub fn status_changed(&mut self, status: ConversationStatus) -> Vec<Effect> {
        self.status = status;
        match self.watcher.observe(status) {
            Some(WatcherAction::FlushQueue) => match self.queue.take_merged() {
                Some(merged) => {
                    tracing::info!(chars = merged.len(), "Sending queued utterances");
                    vec![Effect::Send(merged)]
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        }
    }
}
