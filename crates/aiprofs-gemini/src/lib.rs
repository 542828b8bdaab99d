//! Client for the Gemini generative-language API.
//!
//! Exposes the [`GenerativeApi`] / [`ChatSession`] traits the chat engine is
//! written against, and [`GeminiClient`], the REST implementation.

pub mod api;
pub mod client;
pub mod error;
pub mod mock;

pub use api::{ChatSession, GenerativeApi, RemoteFile};
pub use client::{GeminiChatSession, GeminiClient};
pub use error::GeminiError;
pub use mock::{MockChatSession, MockGenerativeApi};
