//! Application state shared across all route handlers.

use std::sync::Arc;

use aiprofs_chat::ChatDispatcher;
use aiprofs_core::config::ServerConfig;

/// Shared application state, cloned into every handler by axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// Bootstrap, session cache and message forwarding.
    pub dispatcher: Arc<ChatDispatcher>,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    pub fn new(dispatcher: Arc<ChatDispatcher>, server: &ServerConfig) -> Self {
        Self {
            dispatcher,
            allowed_origins: server.allowed_origins.clone().into(),
        }
    }
}
