//! Integration tests for the AIProfs API.
//!
//! Each test drives the router with `oneshot` against an in-memory
//! generative API and reference documents written to a temp directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use aiprofs_api::create_router;
use aiprofs_api::error::ErrorBody;
use aiprofs_api::handlers::{ChatResponse, HealthResponse};
use aiprofs_api::state::AppState;
use aiprofs_chat::{ChatDispatcher, DocumentBootstrapper, SessionStore};
use aiprofs_core::config::ServerConfig;
use aiprofs_core::DocumentSpec;
use aiprofs_gemini::{GenerativeApi, MockGenerativeApi};

// =============================================================================
// Helpers
// =============================================================================

struct TestApp {
    router: axum::Router,
    api: Arc<MockGenerativeApi>,
    dispatcher: Arc<ChatDispatcher>,
    _dir: tempfile::TempDir,
}

fn write_papers(dir: &Path) -> Vec<DocumentSpec> {
    ["march24.pdf", "nov23.pdf"]
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"%PDF-1.4").unwrap();
            DocumentSpec::pdf(path)
        })
        .collect()
}

fn build(api: MockGenerativeApi, documents: impl FnOnce(&Path) -> Vec<DocumentSpec>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(api);
    let api_dyn: Arc<dyn GenerativeApi> = api.clone();
    let dispatcher = Arc::new(ChatDispatcher::new(
        DocumentBootstrapper::new(Arc::clone(&api_dyn), documents(dir.path()))
            .with_poll_policy(Duration::ZERO, 3),
        SessionStore::new(api_dyn),
    ));
    let state = AppState::new(Arc::clone(&dispatcher), &ServerConfig::default());
    TestApp {
        router: create_router(state),
        api,
        dispatcher,
        _dir: dir,
    }
}

fn make_app() -> TestApp {
    build(MockGenerativeApi::new(), write_papers)
}

fn chat_request(message: &str, session_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/chat").header("content-type", "application/json");
    if let Some(id) = session_id {
        builder = builder.header("x-session-id", id);
    }
    let body = serde_json::json!({ "message": message }).to_string();
    builder.body(Body::from(body)).unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn send_chat(app: &TestApp, message: &str, session_id: Option<&str>) -> ChatResponse {
    let resp = app
        .router
        .clone()
        .oneshot(chat_request(message, session_id))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

async fn send_chat_error(app: &TestApp, message: &str, session_id: Option<&str>) -> String {
    let resp = app
        .router
        .clone()
        .oneshot(chat_request(message, session_id))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    body.detail
}

// =============================================================================
// GET /health
// =============================================================================

#[tokio::test]
async fn test_health_reports_healthy() {
    let app = make_app();
    let resp = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_health_has_no_side_effects() {
    let app = make_app();
    for _ in 0..3 {
        let resp = app
            .router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(app.api.upload_count(), 0);
    assert!(app.dispatcher.sessions().is_empty());
}

// =============================================================================
// POST /chat
// =============================================================================

#[tokio::test]
async fn test_chat_without_session_header_generates_one() {
    let app = make_app();
    let resp = app
        .router
        .clone()
        .oneshot(chat_request("What is opportunity cost?", None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let header = resp
        .headers()
        .get("x-session-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body: ChatResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();

    assert_eq!(body.response, "[chat 1 turn 1] What is opportunity cost?");
    assert!(Uuid::parse_str(&body.session_id).is_ok());
    assert_eq!(header, body.session_id);
}

#[tokio::test]
async fn test_chat_blank_session_header_generates_one() {
    let app = make_app();
    let body = send_chat(&app, "hello", Some("  ")).await;
    assert!(Uuid::parse_str(&body.session_id).is_ok());
}

#[tokio::test]
async fn test_chat_follow_up_continues_conversation() {
    let app = make_app();

    let first = send_chat(&app, "What is elasticity?", Some("abc123")).await;
    assert_eq!(first.session_id, "abc123");

    let second = send_chat(&app, "Give an example", Some("abc123")).await;
    assert_eq!(second.session_id, "abc123");
    assert_eq!(second.response, "[chat 1 turn 2] Give an example");

    assert_eq!(app.api.chat_count(), 1);
    assert_eq!(app.api.upload_count(), 2);
    assert_eq!(app.api.seeded_counts(), vec![2]);
}

#[tokio::test]
async fn test_chat_separate_sessions_are_independent() {
    let app = make_app();

    send_chat(&app, "one", Some("alice")).await;
    let bob = send_chat(&app, "one", Some("bob")).await;

    assert_eq!(bob.response, "[chat 2 turn 1] one");
    assert_eq!(app.dispatcher.sessions().len(), 2);
    assert_eq!(app.api.upload_count(), 2);
}

#[tokio::test]
async fn test_chat_after_startup_bootstrap_does_not_reupload() {
    let app = make_app();
    app.dispatcher.bootstrap().await.unwrap();
    assert_eq!(app.api.upload_count(), 2);

    send_chat(&app, "hi", Some("s1")).await;
    assert_eq!(app.api.upload_count(), 2);
}

#[tokio::test]
async fn test_chat_missing_document_returns_500_detail() {
    let app = build(MockGenerativeApi::new(), |dir| {
        vec![DocumentSpec::pdf(dir.join("march24.pdf"))]
    });

    let detail = send_chat_error(&app, "hi", Some("s1")).await;
    assert!(detail.starts_with("required document not found"));
    assert!(detail.contains("march24.pdf"));
    assert_eq!(app.api.upload_count(), 0);
    assert!(app.dispatcher.sessions().is_empty());
}

#[tokio::test]
async fn test_chat_processing_timeout_then_recovery() {
    let app = build(
        MockGenerativeApi::new().with_polls_before_ready(u32::MAX),
        write_papers,
    );

    let detail = send_chat_error(&app, "hi", Some("s1")).await;
    assert!(detail.contains("failed to process"));
    assert!(detail.contains("PROCESSING"));
    assert_eq!(app.api.chat_count(), 0);

    app.api.set_polls_before_ready(0);
    let body = send_chat(&app, "hi", Some("s1")).await;
    assert_eq!(body.response, "[chat 1 turn 1] hi");
}

#[tokio::test]
async fn test_chat_upstream_failure_returns_500_detail() {
    let app = make_app();
    app.api.set_failing_messages(true);

    let detail = send_chat_error(&app, "hi", Some("s1")).await;
    assert!(detail.contains("RESOURCE_EXHAUSTED"));
}

#[tokio::test]
async fn test_chat_empty_message_returns_500_detail() {
    let app = make_app();
    let detail = send_chat_error(&app, "   ", None).await;
    assert_eq!(detail, "message cannot be empty");
    assert_eq!(app.api.upload_count(), 0);
}

#[tokio::test]
async fn test_chat_malformed_body_is_rejected() {
    let app = make_app();
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::post("/chat")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_client_error());

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::post("/chat")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    assert_eq!(app.api.upload_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_share_one_conversation() {
    let app = build(
        MockGenerativeApi::new().with_chat_delay(Duration::from_millis(20)),
        write_papers,
    );

    let mut tasks = Vec::new();
    for i in 0..8 {
        let router = app.router.clone();
        tasks.push(tokio::spawn(async move {
            router
                .oneshot(chat_request(&format!("question {i}"), Some("shared")))
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(app.api.chat_count(), 1);
    assert_eq!(app.api.upload_count(), 2);
    assert_eq!(app.api.message_count(), 8);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_preflight_allowed_origin() {
    let app = make_app();
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,x-session-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
    assert_eq!(headers.get("access-control-allow-methods").unwrap(), "POST");
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "content-type,x-session-id"
    );
}

#[tokio::test]
async fn test_cors_disallowed_origin_gets_no_allow_header() {
    let app = make_app();
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header("origin", "https://evil.example")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_exposes_session_header_on_chat() {
    let app = make_app();
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::post("/chat")
                .header("origin", "https://aiprofs.vercel.app")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"message":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "https://aiprofs.vercel.app"
    );
    assert_eq!(
        headers.get("access-control-expose-headers").unwrap(),
        "x-session-id"
    );
    assert!(headers.get("x-session-id").is_some());
}
