//! AIProfs application binary - composition root.
//!
//! 1. Parse CLI flags, start tracing and load configuration (file, then env,
//!    then flags)
//! 2. Build the Gemini client (exits if the API key is missing)
//! 3. Upload the reference documents once; a failure is logged and retried
//!    on the first chat request
//! 4. Start the axum HTTP server

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter};

use aiprofs_api::{start_server, AppState};
use aiprofs_chat::ChatDispatcher;
use aiprofs_core::AiprofsConfig;
use aiprofs_gemini::GeminiClient;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. RUST_LOG wins; otherwise the level is settled once config is
    // loaded, so the filter sits behind a reload handle.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let initial = env_filter.unwrap_or_else(|| {
        EnvFilter::new(args.log_level.as_deref().unwrap_or("info"))
    });
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AIProfs v{}", env!("CARGO_PKG_VERSION"));

    // Config: file, then env, then flags.
    let mut config = match args.resolve_config_path() {
        Some(path) => AiprofsConfig::load_or_default(&path),
        None => {
            tracing::info!("No configuration file given, using defaults");
            AiprofsConfig::default()
        }
    };
    config.apply_env();
    args.apply_to(&mut config);

    if !filter_from_env {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.general.log_level)) {
            tracing::warn!(error = %e, "Failed to apply configured log level");
        }
    }

    // Generative API client.
    let client = match GeminiClient::from_config(&config.gemini) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Cannot create generative API client");
            return Err(e.into());
        }
    };
    tracing::info!(model = %client.model(), "Generative API client ready");

    let dispatcher = Arc::new(ChatDispatcher::from_config(
        Arc::new(client),
        &config.documents,
    ));

    // Startup bootstrap. Requests retry it if it fails here.
    tracing::info!(
        dir = %config.documents.base_dir().display(),
        files = config.documents.files.len(),
        "Uploading reference documents"
    );
    if let Err(e) = dispatcher.bootstrap().await {
        tracing::error!(error = %e, "Error during startup");
    }

    // API server.
    let state = AppState::new(Arc::clone(&dispatcher), &config.server);
    start_server(&config.server, state).await?;

    Ok(())
}
