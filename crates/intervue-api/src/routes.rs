//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use intervue_core::config::IntervueConfig;
use intervue_core::error::IntervueError;

use crate::handlers;
use crate::state::AppState;

/// Uploaded recordings may be much larger than chat bodies.
const AUDIO_BODY_LIMIT: usize = 25 * 1024 * 1024;
const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser room served from the configured port, plus port+1 for a dev server.
    let port = state.config.general.port;
    let dev_port = port.saturating_add(1);
    let origins: Vec<HeaderValue> = [port, dev_port]
        .iter()
        .flat_map(|p| [format!("http://127.0.0.1:{}", p), format!("http://localhost:{}", p)])
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/transcribe",
            post(handlers::transcribe).layer(DefaultBodyLimit::max(AUDIO_BODY_LIMIT)),
        )
        .route("/api/speech", post(handlers::speech));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Start the HTTP server and serve until `shutdown` resolves.
///
/// Binds to 127.0.0.1 (localhost only) on the configured port.
pub async fn start_server<F>(
    config: &IntervueConfig,
    state: AppState,
    shutdown: F,
) -> Result<(), IntervueError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("127.0.0.1:{}", config.general.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IntervueError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| IntervueError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
