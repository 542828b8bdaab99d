//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, request tracing, a body limit and
//! the two endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use aiprofs_core::config::ServerConfig;
use aiprofs_core::AiprofsError;

use crate::handlers::{self, SESSION_HEADER};
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy: the listed origins with credentials, any method and header.
///
/// Methods and headers are mirrored from the preflight request because
/// wildcards cannot be combined with credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)])
}

/// Bind the configured address and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), AiprofsError> {
    let addr = config.bind_addr();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Failed to bind");
        AiprofsError::Io(e)
    })?;

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router).await?;

    Ok(())
}
