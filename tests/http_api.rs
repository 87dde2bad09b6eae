mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{FailingModel, Harness, POLICY_TEXT};
use docqa::llm::ProviderKind;
use docqa::server::create_app;
use docqa::session::SessionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> (Router, Harness) {
    let h = Harness::new(&[("policy.txt", POLICY_TEXT)]).await;
    (create_app(h.engine.clone(), None), h)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_and_root() {
    let (app, _h) = app().await;

    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_chat_uses_default_session_and_provider() {
    let (app, h) = app().await;

    let (status, body) = send(
        app,
        post_json("/api/chat", json!({ "message": "What is the MFI threshold?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": "Gemini says the threshold is 5000." }));
    assert_eq!(h.sessions.get("default").await.len(), 2);
}

#[tokio::test]
async fn test_chat_provider_is_case_insensitive() {
    let (app, h) = app().await;

    let (status, body) = send(
        app,
        post_json(
            "/api/chat",
            json!({
                "message": "What is the MFI threshold?",
                "session_id": "s42",
                "provider": "FireWorks"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Fireworks says the threshold is 5000.");
    assert_eq!(h.gemini.calls(), 0);
    assert_eq!(h.sessions.get("s42").await.len(), 2);
}

#[tokio::test]
async fn test_chat_bad_requests() {
    let (app, h) = app().await;

    let cases = [
        json!({ "message": "What is the MFI threshold?", "provider": "openai" }),
        json!({ "message": "   " }),
        json!({ "session_id": "s1" }),
    ];
    for case in cases {
        let (status, body) = send(app.clone(), post_json("/api/chat", case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BAD_REQUEST");
        assert!(body["message"].is_string());
    }

    assert_eq!(h.gemini.calls(), 0);
}

#[tokio::test]
async fn test_chat_unconfigured_provider_is_unavailable() {
    let h = Harness::build(&[("policy.txt", POLICY_TEXT)], &[ProviderKind::Gemini], None).await;
    let app = create_app(h.engine.clone(), None);

    let (status, body) = send(
        app,
        post_json(
            "/api/chat",
            json!({ "message": "What is the MFI threshold?", "provider": "fireworks" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_chat_upstream_failure() {
    let h = Harness::build(
        &[("policy.txt", POLICY_TEXT)],
        &[ProviderKind::Gemini],
        Some(Arc::new(FailingModel)),
    )
    .await;
    let app = create_app(h.engine.clone(), None);

    let (status, body) = send(
        app,
        post_json("/api/chat", json!({ "message": "What is the MFI threshold?" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_chat_debug_lists_chunks() {
    let (app, h) = app().await;

    let (status, body) = send(
        app,
        post_json("/api/chat_debug", json!({ "message": "What is the MFI threshold?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "chunks": [POLICY_TEXT] }));
    assert_eq!(h.gemini.calls(), 0);
}

#[tokio::test]
async fn test_chat_debug_blank_message_is_bad_request() {
    let (app, h) = app().await;
    let embeds_before = h.embedder.calls();

    let (status, body) = send(app, post_json("/api/chat_debug", json!({ "message": "   " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
    assert_eq!(h.embedder.calls(), embeds_before);
}

#[tokio::test]
async fn test_warmup() {
    let (app, _h) = app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/warmup")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "warmed",
            "collection_ready": true,
            "providers": ["gemini", "fireworks"]
        })
    );
}

#[tokio::test]
async fn test_cors_allows_configured_origins() {
    let h = Harness::new(&[]).await;
    let app = create_app(h.engine.clone(), Some("https://chat.example.com"));

    for origin in ["http://localhost:8501", "https://chat.example.com"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            origin
        );
    }

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/chat")
        .header(header::ORIGIN, "https://evil.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
