//! One-time upload of the reference documents.
//!
//! The bootstrapper uploads every configured file, polls each until the API
//! reports it ready, and caches the result for the life of the process.
//! Concurrent callers share a single in-flight attempt and its outcome,
//! success or failure. A failure is not cached: a caller arriving after the
//! failed attempt finished starts a new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aiprofs_core::config::DocumentsConfig;
use aiprofs_core::{DocumentSpec, FileState, UploadedDocument};
use aiprofs_gemini::GenerativeApi;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::sleeper::{Sleeper, TokioSleeper};

/// Default pause between readiness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default number of readiness polls per document.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// Uploads the reference documents exactly once per process.
pub struct DocumentBootstrapper {
    api: Arc<dyn GenerativeApi>,
    documents: Vec<DocumentSpec>,
    poll_interval: Duration,
    max_poll_attempts: u32,
    sleeper: Arc<dyn Sleeper>,
    cache: Mutex<BootstrapState>,
    /// Completed attempts; only written while `cache` is locked.
    finished_attempts: AtomicU64,
}

#[derive(Default)]
struct BootstrapState {
    documents: Option<Arc<[UploadedDocument]>>,
    last_failure: Option<Arc<ChatError>>,
}

impl DocumentBootstrapper {
    /// Create a bootstrapper for `documents` with the default poll policy.
    pub fn new(api: Arc<dyn GenerativeApi>, documents: Vec<DocumentSpec>) -> Self {
        Self {
            api,
            documents,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            sleeper: Arc::new(TokioSleeper),
            cache: Mutex::new(BootstrapState::default()),
            finished_attempts: AtomicU64::new(0),
        }
    }

    /// Create a bootstrapper from the `[documents]` config section, with
    /// paths resolved against its base directory.
    pub fn from_config(api: Arc<dyn GenerativeApi>, config: &DocumentsConfig) -> Self {
        Self::new(api, config.resolved_files()).with_poll_policy(
            Duration::from_secs(config.poll_interval_secs),
            config.max_poll_attempts,
        )
    }

    pub fn with_poll_policy(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The configured documents, in upload order.
    pub fn documents(&self) -> &[DocumentSpec] {
        &self.documents
    }

    /// The cached documents, if a bootstrap has completed.
    ///
    /// Returns `None` while an attempt is in flight.
    pub fn ready_documents(&self) -> Option<Arc<[UploadedDocument]>> {
        self.cache
            .try_lock()
            .ok()
            .and_then(|state| state.documents.clone())
    }

    /// Upload and activate every document, or return the cached result.
    ///
    /// A caller that waited on an attempt which then failed receives that
    /// attempt's error as [`ChatError::Shared`] instead of starting another.
    pub async fn bootstrap(&self) -> Result<Arc<[UploadedDocument]>, ChatError> {
        let seen = self.finished_attempts.load(Ordering::Acquire);
        let mut state = self.cache.lock().await;
        if let Some(ref documents) = state.documents {
            return Ok(Arc::clone(documents));
        }
        if self.finished_attempts.load(Ordering::Acquire) != seen {
            if let Some(ref failure) = state.last_failure {
                debug!("Reusing outcome of the bootstrap attempt this caller waited on");
                return Err(ChatError::Shared(Arc::clone(failure)));
            }
        }

        let outcome = self.run().await;
        self.finished_attempts.fetch_add(1, Ordering::Release);
        match outcome {
            Ok(documents) => {
                let documents: Arc<[UploadedDocument]> = documents.into();
                state.documents = Some(Arc::clone(&documents));
                state.last_failure = None;
                Ok(documents)
            }
            Err(e) => {
                let failure = Arc::new(e);
                state.last_failure = Some(Arc::clone(&failure));
                Err(ChatError::Shared(failure))
            }
        }
    }

    async fn run(&self) -> Result<Vec<UploadedDocument>, ChatError> {
        // All files must exist before anything is uploaded.
        for spec in &self.documents {
            if !spec.path.is_file() {
                warn!(path = %spec.path.display(), "Reference document missing");
                return Err(ChatError::MissingFile(spec.path.clone()));
            }
        }

        let mut uploaded = Vec::with_capacity(self.documents.len());
        for spec in &self.documents {
            let display_name = spec.display_name();
            let file = self
                .api
                .upload_file(&spec.path, &spec.mime_type, &display_name)
                .await?;
            info!("Uploaded file '{}' as: {}", display_name, file.uri);

            uploaded.push(UploadedDocument {
                local_path: spec.path.clone(),
                name: file.name,
                uri: file.uri,
                mime_type: file.mime_type.unwrap_or_else(|| spec.mime_type.clone()),
                display_name,
                state: file.state,
                uploaded_at: Utc::now(),
            });
        }

        info!(count = uploaded.len(), "Waiting for file processing");
        for document in &mut uploaded {
            let state = self.wait_until_settled(&document.name).await?;
            document.state = state;
            if !state.is_ready() {
                warn!(name = %document.name, state = %state, "Document failed to process");
                return Err(ChatError::DocumentProcessing {
                    name: document.name.clone(),
                    state,
                });
            }
        }
        info!(count = uploaded.len(), "All documents ready");

        Ok(uploaded)
    }

    /// Poll until the file leaves `PROCESSING` or the attempts run out.
    /// Returns the last observed state.
    async fn wait_until_settled(&self, name: &str) -> Result<FileState, ChatError> {
        let mut state = FileState::Processing;
        for attempt in 1..=self.max_poll_attempts {
            state = self.api.get_file(name).await?.state;
            if !state.is_processing() {
                return Ok(state);
            }
            debug!(name, attempt, "Document still processing");
            if attempt < self.max_poll_attempts {
                self.sleeper.sleep(self.poll_interval).await;
            }
        }
        Ok(state)
    }
}
