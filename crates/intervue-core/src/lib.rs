pub mod config;
pub mod error;
pub mod types;

pub use config::{IntervueConfig, Secrets};
pub use error::{IntervueError, Result};
pub use types::*;
