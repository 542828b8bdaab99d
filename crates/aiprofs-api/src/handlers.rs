//! Route handler functions.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request and response header carrying the client's session identifier.
pub const SESSION_HEADER: &str = "x-session-id";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(rename = "X-Session-Id")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /chat - forward a message to the caller's conversation.
///
/// The session comes from the `X-Session-Id` header; a missing or blank
/// header starts a new session under a fresh UUID. The id is returned both in
/// the body and as a response header.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = session_id_from(&headers);
    tracing::debug!(session_id = %session_id, "Chat request received");

    let reply = state
        .dispatcher
        .respond(&request.message, &session_id)
        .await?;

    Ok((
        [(SESSION_HEADER, session_id.clone())],
        Json(ChatResponse {
            response: reply,
            session_id,
        }),
    ))
}

/// GET /health - liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

fn session_id_from(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
