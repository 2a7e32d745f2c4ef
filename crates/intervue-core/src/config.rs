use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{IntervueError, Result};

/// Default interviewer persona.
pub const DEFAULT_AGENT_SYSTEM_PROMPT: &str = "You are a senior software engineer at a tech giant, \
conducting interviews with candidates. Read the context and follow the instructions strictly. \
To begin, start by using the `read_file` function to retrieve `./README.md`.";

/// Top-level configuration for the Intervue server.
///
/// Loaded from `~/.intervue/config.toml` by default. API keys never live here;
/// see [`Secrets`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervueConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub room: RoomConfig,
}

impl IntervueConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: IntervueConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| IntervueError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// HTTP port the API server binds on 127.0.0.1.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Root directory of the interview reference material.
    pub context_dir: String,
    /// Root directory of the interviewer's file memory.
    pub memory_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            port: 3030,
            log_level: "info".to_string(),
            context_dir: "./context".to_string(),
            memory_dir: "./generated".to_string(),
        }
    }
}

/// Interviewer agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model that plays the interviewer.
    pub model: String,
    /// Model used to convert PDFs from the context directory to markdown.
    pub pdf_model: String,
    /// Base URL of the hosted Messages API (without the `/messages` suffix).
    pub base_url: String,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Maximum model calls per turn.
    pub max_steps: u32,
    /// Output token cap per model call.
    pub max_tokens: u32,
    /// Interviewer persona.
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            pdf_model: "claude-haiku-4-5".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_version: "2023-06-01".to_string(),
            max_steps: 5,
            max_tokens: 4096,
            system_prompt: DEFAULT_AGENT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Background answer-verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Model that checks answers with web search.
    pub model: String,
    /// Maximum model calls per verification.
    pub max_steps: u32,
    /// `max_uses` for each of the hosted web_search and web_fetch tools.
    pub max_search_uses: u32,
    /// Wall-clock limit for one verification.
    pub timeout_secs: u64,
    /// Output token cap per model call.
    pub max_tokens: u32,
    /// How long shutdown waits for in-flight verifications. 0 abandons them.
    pub shutdown_grace_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            model: "claude-haiku-4-5".to_string(),
            max_steps: 3,
            max_search_uses: 1,
            timeout_secs: 60,
            max_tokens: 1024,
            shutdown_grace_secs: 0,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Base URL of the hosted audio API.
    pub base_url: String,
    /// Transcription model.
    pub model: String,
    /// Context prompt sent with every transcription.
    pub prompt: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-transcribe".to_string(),
            prompt: "The following audio is in a tech interview of a candidate.".to_string(),
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Base URL of the hosted audio API.
    pub base_url: String,
    /// Speech model.
    pub model: String,
    /// Voice name.
    pub voice: String,
    /// Playback speed multiplier.
    pub speed: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini-tts".to_string(),
            voice: "alloy".to_string(),
            speed: 1.2,
        }
    }
}

/// Client-side interview room settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Prefix each transcribed utterance with its local timestamp.
    pub stamp_utterances: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            stamp_utterances: true,
        }
    }
}

/// API keys for the hosted services, read from the environment only.
#[derive(Clone)]
pub struct Secrets {
    pub anthropic_api_key: SecretString,
    pub openai_api_key: SecretString,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl Secrets {
    pub const ANTHROPIC_VAR: &'static str = "ANTHROPIC_API_KEY";
    pub const OPENAI_VAR: &'static str = "OPENAI_API_KEY";

    /// Read `ANTHROPIC_API_KEY` and `OPENAI_API_KEY` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve keys through an arbitrary lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| IntervueError::Config(format!("Missing environment variable: {}", key)))
        };

        Ok(Self {
            anthropic_api_key: fetch(Self::ANTHROPIC_VAR)?,
            openai_api_key: fetch(Self::OPENAI_VAR)?,
        })
    }
}
