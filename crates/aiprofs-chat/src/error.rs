//! Error types for document bootstrap and chat dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use aiprofs_core::FileState;
use aiprofs_gemini::GeminiError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("required document not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("document {name} failed to process (last state: {state})")]
    DocumentProcessing { name: String, state: FileState },
    #[error("{0}")]
    Dispatch(String),
    #[error("generative API error: {0}")]
    Api(#[from] GeminiError),
    #[error("message cannot be empty")]
    EmptyMessage,
    /// A bootstrap failure handed to every caller that waited on the attempt.
    #[error(transparent)]
    Shared(Arc<ChatError>),
}

impl ChatError {
    /// Whether the error came from the document bootstrap and will be retried
    /// by the next chat request.
    pub fn is_bootstrap_failure(&self) -> bool {
        matches!(
            self.root(),
            ChatError::MissingFile(_) | ChatError::DocumentProcessing { .. } | ChatError::Api(_)
        )
    }

    /// The underlying error, looking through [`ChatError::Shared`].
    pub fn root(&self) -> &ChatError {
        match self {
            ChatError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}
