//! Session-keyed conversation cache.
//!
//! Each session identifier maps to exactly one conversation handle, created
//! lazily on the first message and kept for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aiprofs_core::UploadedDocument;
use aiprofs_gemini::{ChatSession, GenerativeApi};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::ChatError;

type HandleCell = Arc<OnceCell<Arc<dyn ChatSession>>>;

/// In-memory map from session identifier to conversation handle.
///
/// Creation is serialized per key: concurrent first messages for the same
/// session wait on one creation instead of racing. The map lock is only held
/// for the lookup, never across a network call.
pub struct SessionStore {
    api: Arc<dyn GenerativeApi>,
    sessions: Mutex<HashMap<String, HandleCell>>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn GenerativeApi>) -> Self {
        Self {
            api,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle for `session_id`, creating one seeded with
    /// `documents` if the session is new.
    ///
    /// An existing handle is returned unchanged. A failed creation leaves the
    /// session empty so the next message retries.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        documents: &[UploadedDocument],
    ) -> Result<Arc<dyn ChatSession>, ChatError> {
        let cell = {
            let mut sessions = self
                .sessions
                .lock()
                .map_err(|e| ChatError::Dispatch(format!("session lock poisoned: {}", e)))?;
            Arc::clone(sessions.entry(session_id.to_string()).or_default())
        };

        let handle = cell
            .get_or_try_init(|| async {
                debug!(session_id, documents = documents.len(), "Starting conversation");
                self.api.start_chat(documents).await
            })
            .await
            .map_err(|e| {
                warn!(
                    session_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to start conversation"
                );
                ChatError::Dispatch(e.to_string())
            })?;

        Ok(Arc::clone(handle))
    }

    /// Whether `session_id` has a live conversation.
    #[cfg(test)]
    fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .map(|sessions| {
                sessions
                    .get(session_id)
                    .is_some_and(|cell| cell.initialized())
            })
            .unwrap_or(false)
    }

    /// Number of sessions with a live conversation.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .map(|sessions| sessions.values().filter(|cell| cell.initialized()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
