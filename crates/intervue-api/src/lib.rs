//! Intervue API crate - axum HTTP server for the interview room.
//!
//! Serves the chat turn endpoint (Server-Sent Events), audio transcription,
//! speech synthesis, and a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
