//! Chat dispatcher: routes a message to its session's conversation.

use std::sync::Arc;

use aiprofs_core::config::DocumentsConfig;
use aiprofs_core::UploadedDocument;
use aiprofs_gemini::GenerativeApi;
use tracing::{debug, warn};

use crate::bootstrap::DocumentBootstrapper;
use crate::error::ChatError;
use crate::session::SessionStore;

/// Central entry point for chat requests.
///
/// Owns the document bootstrapper and the session store; one instance is
/// built at startup and shared by every request handler.
pub struct ChatDispatcher {
    bootstrapper: DocumentBootstrapper,
    sessions: SessionStore,
}

impl ChatDispatcher {
    pub fn new(bootstrapper: DocumentBootstrapper, sessions: SessionStore) -> Self {
        Self {
            bootstrapper,
            sessions,
        }
    }

    /// Build a dispatcher whose bootstrapper and sessions share `api`.
    pub fn from_config(api: Arc<dyn GenerativeApi>, documents: &DocumentsConfig) -> Self {
        Self::new(
            DocumentBootstrapper::from_config(Arc::clone(&api), documents),
            SessionStore::new(api),
        )
    }

    pub fn bootstrapper(&self) -> &DocumentBootstrapper {
        &self.bootstrapper
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run the document bootstrap (no-op once it has succeeded).
    pub async fn bootstrap(&self) -> Result<Arc<[UploadedDocument]>, ChatError> {
        self.bootstrapper.bootstrap().await
    }

    /// Send `message` in `session_id`'s conversation and return the reply.
    ///
    /// Bootstraps the documents first if no earlier attempt succeeded, and
    /// creates the session's conversation on its first message.
    pub async fn respond(&self, message: &str, session_id: &str) -> Result<String, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let documents = self.bootstrapper.bootstrap().await?;
        let conversation = self.sessions.get_or_create(session_id, &documents).await?;

        let reply = conversation.send_message(message).await.map_err(|e| {
            warn!(
                session_id,
                error = %e,
                retryable = e.is_retryable(),
                "Message dispatch failed"
            );
            ChatError::Dispatch(e.to_string())
        })?;

        debug!(session_id, reply_len = reply.len(), "Reply received");
        Ok(reply)
    }
}
