//! Interviewer agent for Intervue.
//!
//! Runs the interviewer as a bounded tool-use loop against the hosted Messages
//! API, gives it read-only access to the candidate's context directory, a
//! scratch memory, PDF conversion and background answer verification, and
//! provides the web-backed [`HostedLookup`] used by the verification dispatcher.

pub mod agent;
pub mod error;
pub mod glob;
pub mod lookup;
pub mod memory;
pub mod messages;
pub mod tools;
pub mod workspace;

pub use agent::{to_api_messages, AgentEvent, AgentStream, ConversationAgent, InterviewAgent, ScriptedAgent};
pub use error::AgentError;
pub use lookup::HostedLookup;
pub use memory::{MemoryCommand, MemoryStore};
pub use messages::{MessagesApi, MessagesClient, ScriptedMessages};
pub use tools::{PdfReader, Toolbox};
pub use workspace::Workspace;
