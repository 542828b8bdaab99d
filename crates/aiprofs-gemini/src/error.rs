//! Error types for the generative-language API client.

use aiprofs_core::AiprofsError;

/// Errors from talking to the generative-language API.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("unexpected API response: {0}")]
    Protocol(String),
}

impl From<AiprofsError> for GeminiError {
    fn from(err: AiprofsError) -> Self {
        match err {
            AiprofsError::Io(e) => GeminiError::Io(e),
            other => GeminiError::Configuration(other.to_string()),
        }
    }
}

impl GeminiError {
    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiError::Transport(e) => e.is_connect() || e.is_timeout(),
            GeminiError::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}
