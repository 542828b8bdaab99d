//! CLI argument definitions for the AIProfs backend.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use aiprofs_core::AiprofsConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "AIPROFS_CONFIG";

/// AIProfs: chat backend answering exam questions over two reference papers.
#[derive(Parser, Debug)]
#[command(name = "aiprofs", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory holding the reference documents.
    #[arg(short = 'd', long = "documents-dir")]
    pub documents_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > AIPROFS_CONFIG env var. `None` means run on
    /// defaults.
    pub fn resolve_config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
    }

    /// Overwrite config values with the flags that were given.
    pub fn apply_to(&self, config: &mut AiprofsConfig) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref dir) = self.documents_dir {
            config.documents.base_dir = Some(dir.clone());
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}
