use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Processing state of a file registered with the generative-language API.
///
/// Serialized with the upstream wire names (`PROCESSING`, `ACTIVE`, ...).
/// Any value the API adds later deserializes as `Unspecified`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// Uploaded, still being processed upstream.
    Processing,
    /// Ready to be referenced from a conversation.
    Active,
    /// Upstream processing failed; the file is unusable.
    Failed,
    #[default]
    #[serde(rename = "STATE_UNSPECIFIED", other)]
    Unspecified,
}

impl FileState {
    pub fn is_ready(self) -> bool {
        self == FileState::Active
    }

    pub fn is_processing(self) -> bool {
        self == FileState::Processing
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unspecified => "STATE_UNSPECIFIED",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A reference document to upload at bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// Local path; relative paths are resolved against the documents base dir.
    pub path: PathBuf,
    /// MIME type sent with the upload.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Display name; defaults to the file name.
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_mime_type() -> String {
    "application/pdf".to_string()
}

impl DocumentSpec {
    /// A PDF document at `path`.
    pub fn pdf(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime_type: default_mime_type(),
            display_name: None,
        }
    }

    /// The configured display name, or the file name of `path`.
    pub fn display_name(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.path.to_string_lossy().to_string())
        })
    }
}

/// One reference file registered with the generative-language API.
///
/// Created once per process during bootstrap. Only `state` changes after
/// creation, as polling observes upstream transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    /// Absolute local path the file was read from.
    pub local_path: PathBuf,
    /// Remote resource name, e.g. `files/abc-123`.
    pub name: String,
    /// Remote URI used to reference the file from conversation turns.
    pub uri: String,
    pub mime_type: String,
    pub display_name: String,
    pub state: FileState,
    pub uploaded_at: DateTime<Utc>,
}
