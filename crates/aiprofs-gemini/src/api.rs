//! Trait seam between the chat engine and the generative-language API.
//!
//! The chat crate only sees these traits, so tests can substitute an
//! in-memory fake for the HTTP client.

use std::path::Path;
use std::sync::Arc;

use aiprofs_core::{FileState, UploadedDocument};
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GeminiError;

/// File metadata as reported by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub state: FileState,
}

/// Operations the backend needs from the generative-language API.
#[async_trait]
pub trait GenerativeApi: Send + Sync {
    /// Upload a local file and return its initial metadata.
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, GeminiError>;

    /// Fetch the current metadata (including state) of an uploaded file.
    async fn get_file(&self, name: &str) -> Result<RemoteFile, GeminiError>;

    /// Open a conversation whose first turn references `documents`.
    async fn start_chat(
        &self,
        documents: &[UploadedDocument],
    ) -> Result<Arc<dyn ChatSession>, GeminiError>;
}

/// A live conversation. Each call is one user turn followed by one model turn.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<String, GeminiError>;
}
