//! Interview room client logic.
//!
//! Push-to-talk recording, the queue that holds utterances back while the
//! interviewer is still answering, and parsing of the interviewer's
//! `<speech>`/`<screen>` markup. The coordinator is synchronous; the driver
//! executes its effects against devices, a transcriber and a message sink.

pub mod coordinator;
pub mod driver;
pub mod error;
pub mod markup;
pub mod queue;
pub mod recorder;
pub mod status;

pub use coordinator::{Effect, FocusTarget, Gesture, KeyCode, PushToTalk};
pub use driver::{AudioDevices, HttpTranscriber, MessageSink, PushToTalkDriver, Transcriber};
pub use error::RoomError;
pub use markup::{AssistantMarkup, MarkupTracker, MarkupUpdate, SpeechCue};
pub use queue::{PendingUtteranceQueue, UtteranceFormat};
pub use recorder::RecorderState;
pub use status::{ConversationStatus, StatusWatcher, WatcherAction};
