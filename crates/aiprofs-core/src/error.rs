use thiserror::Error;

/// Top-level error type for the AIProfs backend.
///
/// Subsystem crates define their own error types and convert into or wrap
/// this one where configuration and I/O failures cross crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiprofsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AiprofsError {
    fn from(err: toml::de::Error) -> Self {
        AiprofsError::Configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for AiprofsError {
    fn from(err: toml::ser::Error) -> Self {
        AiprofsError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for AiprofsError {
    fn from(err: serde_json::Error) -> Self {
        AiprofsError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AiprofsError>;
