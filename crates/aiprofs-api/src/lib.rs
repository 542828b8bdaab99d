//! AIProfs API crate - axum HTTP server and route handlers.
//!
//! Exposes `POST /chat` and `GET /health` behind a credentialed CORS policy.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
