use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AiprofsError, Result};
use crate::types::DocumentSpec;

/// Environment variable holding the generative-language API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "PORT";

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant designed to help college \
students study for their exams. They will ask various questions regarding principles of \
economics and management, and your job is to answer them. You are given context of 2 \
different past year question papers.";

/// Top-level configuration for the AIProfs backend.
///
/// Loaded from a TOML file when one is given; every section falls back to
/// defaults, so an empty file (or none at all) yields a working setup as long
/// as the API credential is present in the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiprofsConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

impl AiprofsConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AiprofsConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply `GEMINI_API_KEY` and `PORT` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using `lookup` as the variable source.
    ///
    /// An unparsable `PORT` is ignored with a warning.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.gemini.api_key = Some(key);
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid {} value", PORT_ENV),
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener and CORS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. Credentials are allowed for these origins.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "https://aiprofs.vercel.app".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Generative-language API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API credential. Normally supplied through `GEMINI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
    /// Network timeout applied to every upstream request.
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "learnlm-1.5-pro-experimental".to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    /// The API credential, or a configuration error if it is missing or blank.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(AiprofsError::Configuration(format!(
                "{} is not set",
                API_KEY_ENV
            ))),
        }
    }
}

/// Reference documents uploaded at bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory relative document paths are resolved against. Defaults to
    /// the directory containing the running executable.
    pub base_dir: Option<PathBuf>,
    pub files: Vec<DocumentSpec>,
    /// Seconds between readiness polls.
    pub poll_interval_secs: u64,
    /// Maximum readiness polls per document.
    pub max_poll_attempts: u32,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            files: vec![DocumentSpec::pdf("march24.pdf"), DocumentSpec::pdf("nov23.pdf")],
            poll_interval_secs: 10,
            max_poll_attempts: 30,
        }
    }
}

impl DocumentsConfig {
    /// The effective base directory for relative document paths.
    pub fn base_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.base_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Document specs with every path made absolute against [`Self::base_dir`].
    pub fn resolved_files(&self) -> Vec<DocumentSpec> {
        let base = self.base_dir();
        self.files
            .iter()
            .map(|spec| {
                let path = if spec.path.is_absolute() {
                    spec.path.clone()
                } else {
                    base.join(&spec.path)
                };
                DocumentSpec {
                    path,
                    ..spec.clone()
                }
            })
            .collect()
    }
}
