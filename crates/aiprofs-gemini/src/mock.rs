//! In-memory [`GenerativeApi`] for tests and offline runs.
//!
//! Counts every call so callers can assert how often uploads, polls and
//! conversation creations happened.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aiprofs_core::{FileState, UploadedDocument};
use async_trait::async_trait;

use crate::api::{ChatSession, GenerativeApi, RemoteFile};
use crate::error::GeminiError;

/// Scriptable fake of the generative-language API.
///
/// Uploaded files report `PROCESSING` for the first `polls_before_ready`
/// status lookups, then `final_state`. Conversations answer with
/// `"[chat <n> turn <t>] <message>"` so tests can tell handles apart.
pub struct MockGenerativeApi {
    polls_before_ready: AtomicU32,
    final_state: Mutex<FileState>,
    chat_delay: Duration,
    start_chat_failures: AtomicUsize,
    fail_messages: Arc<AtomicBool>,
    fail_uploads: AtomicBool,
    uploads: AtomicUsize,
    polls: AtomicUsize,
    chats: AtomicUsize,
    messages: Arc<AtomicUsize>,
    poll_counts: Mutex<HashMap<String, u32>>,
    seeded: Mutex<Vec<usize>>,
}

impl Default for MockGenerativeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerativeApi {
    /// Files become `ACTIVE` on the first poll; every call succeeds.
    pub fn new() -> Self {
        Self {
            polls_before_ready: AtomicU32::new(0),
            final_state: Mutex::new(FileState::Active),
            chat_delay: Duration::ZERO,
            start_chat_failures: AtomicUsize::new(0),
            fail_messages: Arc::new(AtomicBool::new(false)),
            fail_uploads: AtomicBool::new(false),
            uploads: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            chats: AtomicUsize::new(0),
            messages: Arc::new(AtomicUsize::new(0)),
            poll_counts: Mutex::new(HashMap::new()),
            seeded: Mutex::new(Vec::new()),
        }
    }

    /// Report `PROCESSING` for this many polls per file before the final state.
    pub fn with_polls_before_ready(self, polls: u32) -> Self {
        self.polls_before_ready.store(polls, Ordering::SeqCst);
        self
    }

    pub fn with_final_state(self, state: FileState) -> Self {
        self.set_final_state(state);
        self
    }

    /// Delay conversation creation, widening race windows in tests.
    pub fn with_chat_delay(mut self, delay: Duration) -> Self {
        self.chat_delay = delay;
        self
    }

    /// Fail the next `times` conversation creations.
    pub fn with_start_chat_failures(self, times: usize) -> Self {
        self.start_chat_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn with_failing_uploads(self) -> Self {
        self.fail_uploads.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_polls_before_ready(&self, polls: u32) {
        self.polls_before_ready.store(polls, Ordering::SeqCst);
    }

    pub fn set_final_state(&self, state: FileState) {
        if let Ok(mut current) = self.final_state.lock() {
            *current = state;
        }
    }

    pub fn set_failing_messages(&self, failing: bool) {
        self.fail_messages.store(failing, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn chat_count(&self) -> usize {
        self.chats.load(Ordering::SeqCst)
    }

    pub fn message_count(&self) -> usize {
        self.messages.load(Ordering::SeqCst)
    }

    /// Number of documents each created conversation was seeded with, in
    /// creation order.
    pub fn seeded_counts(&self) -> Vec<usize> {
        self.seeded
            .lock()
            .map(|seeded| seeded.clone())
            .unwrap_or_default()
    }

    fn unavailable(what: &str) -> GeminiError {
        GeminiError::Http {
            status: 503,
            message: format!("UNAVAILABLE: mock {what} failure"),
        }
    }
}

#[async_trait]
impl GenerativeApi for MockGenerativeApi {
    async fn upload_file(
        &self,
        _path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, GeminiError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(Self::unavailable("upload"));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteFile {
            name: format!("files/mock-{n}"),
            display_name: Some(display_name.to_string()),
            mime_type: Some(mime_type.to_string()),
            uri: format!("https://mock.invalid/v1beta/files/mock-{n}"),
            state: FileState::Processing,
        })
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, GeminiError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let count = {
            let mut counts = self
                .poll_counts
                .lock()
                .map_err(|e| GeminiError::Protocol(format!("poll lock poisoned: {e}")))?;
            let entry = counts.entry(name.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let state = if count <= self.polls_before_ready.load(Ordering::SeqCst) {
            FileState::Processing
        } else {
            self.final_state
                .lock()
                .map(|s| *s)
                .unwrap_or(FileState::Unspecified)
        };

        Ok(RemoteFile {
            name: name.to_string(),
            display_name: None,
            mime_type: None,
            uri: format!("https://mock.invalid/v1beta/{name}"),
            state,
        })
    }

    async fn start_chat(
        &self,
        documents: &[UploadedDocument],
    ) -> Result<Arc<dyn ChatSession>, GeminiError> {
        if !self.chat_delay.is_zero() {
            tokio::time::sleep(self.chat_delay).await;
        }
        let should_fail = self
            .start_chat_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Self::unavailable("start_chat"));
        }

        if let Ok(mut seeded) = self.seeded.lock() {
            seeded.push(documents.len());
        }
        let id = self.chats.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockChatSession {
            id,
            turns: AtomicUsize::new(0),
            fail_messages: Arc::clone(&self.fail_messages),
            messages: Arc::clone(&self.messages),
        }))
    }
}

/// Conversation produced by [`MockGenerativeApi`].
pub struct MockChatSession {
    id: usize,
    turns: AtomicUsize,
    fail_messages: Arc<AtomicBool>,
    messages: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatSession for MockChatSession {
    async fn send_message(&self, message: &str) -> Result<String, GeminiError> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(GeminiError::Http {
                status: 429,
                message: "RESOURCE_EXHAUSTED: mock quota exceeded".to_string(),
            });
        }
        self.messages.fetch_add(1, Ordering::SeqCst);
        let turn = self.turns.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("[chat {} turn {}] {}", self.id, turn, message))
    }
}
