//! Intervue server binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Read API keys from the environment
//! 3. Build the hosted model client, background verifier and interviewer toolbox
//! 4. Serve the HTTP API until Ctrl-C, then settle in-flight verifications

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use intervue_agent::{
    HostedLookup, InterviewAgent, MemoryStore, MessagesApi, MessagesClient, PdfReader, Toolbox,
    Workspace,
};
use intervue_api::routes;
use intervue_api::state::AppState;
use intervue_core::config::{IntervueConfig, Secrets};
use intervue_verify::{Mailbox, VerificationDispatcher};
use intervue_voice::{OpenAiSpeech, OpenAiTranscriber};

use cli::CliArgs;

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config (CLI > env > file > defaults). Tracing is not up yet, so a
    // load failure is logged below.
    let config_file = args.resolve_config_path();
    let (config, load_error) = args.load_config();

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Intervue v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config; using defaults"
        ),
    }

    let secrets = match Secrets::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "API keys are read from ANTHROPIC_API_KEY and OPENAI_API_KEY");
            return Err(e.into());
        }
    };

    let context_dir = Path::new(&config.general.context_dir);
    if !context_dir.join("README.md").is_file() {
        tracing::warn!(
            dir = %context_dir.display(),
            "Context directory has no README.md; the interviewer starts by reading it"
        );
    }

    // Hosted model client, shared by the interviewer, the PDF reader and the verifier.
    let messages: Arc<dyn MessagesApi> = Arc::new(MessagesClient::new(
        secrets.anthropic_api_key.clone(),
        &config.agent.base_url,
        &config.agent.api_version,
    )?);

    // Background verification.
    let lookup = Arc::new(HostedLookup::new(Arc::clone(&messages), &config.verification));
    let dispatcher = Arc::new(VerificationDispatcher::new(
        lookup,
        Mailbox::new(),
        Duration::from_secs(config.verification.timeout_secs),
    ));
    tracing::info!(
        model = %config.verification.model,
        timeout_secs = config.verification.timeout_secs,
        "Verification dispatcher ready"
    );

    // Interviewer.
    let toolbox = Arc::new(Toolbox::new(
        Workspace::new(&config.general.context_dir),
        MemoryStore::new(&config.general.memory_dir),
        Arc::clone(&dispatcher),
        PdfReader::new(
            Arc::clone(&messages),
            config.agent.pdf_model.clone(),
            config.agent.max_tokens,
        ),
    ));
    let agent = Arc::new(InterviewAgent::new(
        Arc::clone(&messages),
        toolbox,
        &config.agent,
    ));
    tracing::info!(
        model = %config.agent.model,
        max_steps = config.agent.max_steps,
        context_dir = %config.general.context_dir,
        "Interviewer ready"
    );

    // Voice.
    let transcriber = Arc::new(OpenAiTranscriber::new(
        secrets.openai_api_key.clone(),
        config.transcription.clone(),
    )?);
    let speech = Arc::new(OpenAiSpeech::new(
        secrets.openai_api_key.clone(),
        config.speech.clone(),
    )?);

    // === API server ===

    let state = AppState::new(
        config.clone(),
        Arc::clone(&dispatcher),
        agent,
        transcriber,
        speech,
    );

    if let Err(e) = routes::start_server(&config, state, shutdown_signal()).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!("Try: INTERVUE_PORT={} cargo run -p intervue-app", config.general.port.saturating_add(1));
        return Err(e.into());
    }

    // Shutdown.
    let grace = Duration::from_secs(config.verification.shutdown_grace_secs);
    if dispatcher.shutdown(grace).await {
        tracing::info!("All verifications settled");
    }

    tracing::info!("Intervue stopped");
    Ok(())
}
