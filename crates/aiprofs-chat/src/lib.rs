//! Chat engine for AiProfs.
//!
//! Uploads the reference documents once per process, keeps one conversation
//! per client session, and dispatches each message to its conversation.

pub mod bootstrap;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod sleeper;

pub use bootstrap::{DocumentBootstrapper, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use dispatcher::ChatDispatcher;
pub use error::ChatError;
pub use session::SessionStore;
pub use sleeper::{Sleeper, TokioSleeper};
