//! HTTP API tests
//!
//! Exercise the router in-process with no network and no hosted services:
//! unconfigured paths must degrade exactly as the client contract expects.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use atlas_studio::api::{ApiState, router};
use atlas_studio::db::{SessionRepo, init_memory};
use atlas_studio::question::{CoachConfig, InterviewCoach, LlmClient};
use atlas_studio::retry::RetryPolicy;

fn test_router(uploads_dir: std::path::PathBuf) -> Router {
    let sessions = SessionRepo::new(init_memory().unwrap());
    let llm = LlmClient::new(
        "https://example.invalid/v1",
        String::new(),
        "test-model".to_string(),
        Duration::from_secs(1),
        RetryPolicy::default(),
    )
    .unwrap();
    let coach = Arc::new(InterviewCoach::new(
        llm,
        sessions.clone(),
        CoachConfig::default(),
    ));

    router(Arc::new(ApiState {
        coach,
        sessions,
        synthesizer: None,
        transcriber: None,
        uploads_dir,
        session_limit: 100,
    }))
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn question_next_requires_role_track_level() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(json_request(
            "/api/question/next",
            json!({"role": "", "track": "System Design", "level": "Mid"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn question_next_rejects_unknown_track() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(json_request(
            "/api/question/next",
            json!({"role": "Engineer", "track": "Quantum", "level": "Mid"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn question_next_without_llm_key_is_unavailable() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(json_request(
            "/api/question/next",
            json!({
                "role": "Backend Engineer",
                "track": "System Design",
                "level": "Mid",
                "language": "en",
                "session_id": "sess-1"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "not_configured");
}

#[tokio::test]
async fn evaluate_degrades_to_local_fallback() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(json_request(
            "/api/evaluate",
            json!({
                "role": "Backend Engineer",
                "track": "System Design",
                "level": "Mid",
                "language": "en",
                "question": "How do you shard?",
                "answer": "First, hash the key. The impact is even load, and the tradeoff is resharding cost."
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["fallback"], true);
    let score = body["score"].as_u64().unwrap();
    assert!((25..=85).contains(&score));
    assert!(body["detail"].as_str().unwrap().contains("fallback"));
}

#[tokio::test]
async fn evaluate_requires_answer() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(json_request(
            "/api/evaluate",
            json!({
                "role": "Backend Engineer",
                "track": "System Design",
                "level": "Mid",
                "question": "Q?",
                "answer": "   "
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sample_answer_falls_back_without_llm() {
    let app = test_router(std::env::temp_dir());
    let response = app
        .oneshot(json_request(
            "/api/answer",
            json!({
                "role": "Backend Engineer",
                "track": "System Design",
                "level": "Mid",
                "question": "How do you shard a database?"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["answer"]
        .as_str()
        .unwrap()
        .contains("How do you shard a database?"));
}

#[tokio::test]
async fn voice_endpoints_unavailable_without_speech_key() {
    let app = test_router(std::env::temp_dir());

    let response = app
        .clone()
        .oneshot(json_request("/api/voice", json!({"text": "hello"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(
            Request::post("/api/transcribe")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=xxboundaryxx",
                )
                .body(Body::from("--xxboundaryxx--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn upload_stores_sanitized_recording() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path().to_path_buf());

    let boundary = "xxboundaryxx";
    let payload = [
        format!("--{boundary}\r\n"),
        "Content-Disposition: form-data; name=\"media\"; filename=\"my session (1).webm\"\r\n"
            .to_string(),
        "Content-Type: video/webm\r\n\r\n".to_string(),
        "fake-webm-bytes".to_string(),
        format!("\r\n--{boundary}--\r\n"),
    ]
    .concat();

    let response = app
        .oneshot(
            Request::post("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let filename = body["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with("my_session__1_.webm"), "{filename}");
    assert_eq!(body["size"], 15);

    let stored = dir.path().join(&filename);
    assert_eq!(std::fs::read(stored).unwrap(), b"fake-webm-bytes");
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(dir.path().to_path_buf());

    let response = app
        .oneshot(
            Request::post("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=xxboundaryxx",
                )
                .body(Body::from("--xxboundaryxx--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
