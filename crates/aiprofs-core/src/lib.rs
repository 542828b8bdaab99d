pub mod config;
pub mod error;
pub mod types;

pub use config::AiprofsConfig;
pub use error::{AiprofsError, Result};
pub use types::*;
