use crate::config::ServerConfig;
use crate::error::RagError;
use crate::llm::ProviderKind;
use crate::rag::RagEngine;
use crate::session::DEFAULT_SESSION_ID;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

/// Origins of the bundled chat frontend
const DEFAULT_FRONTEND_ORIGINS: [&str; 2] = ["http://127.0.0.1:8501", "http://localhost:8501"];

/// Body of `POST /api/chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Body of `POST /api/chat_debug`
#[derive(Debug, Deserialize)]
pub struct DebugRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DebugResponse {
    pub chunks: Vec<String>,
}

/// Errors returned by the HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Rag(err) => match err {
                RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                RagError::Provider { .. } | RagError::Embedding(_) => StatusCode::BAD_GATEWAY,
                RagError::VectorStore(_) | RagError::ProviderUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                RagError::Config(_) | RagError::Document(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::BAD_GATEWAY => "UPSTREAM_ERROR",
            StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router with all routes and CORS
pub fn create_app(engine: Arc<RagEngine>, frontend_origin: Option<&str>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/warmup", post(warmup_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat_debug", post(chat_debug_handler))
        .layer(cors_layer(frontend_origin))
        .with_state(engine)
}

fn cors_layer(frontend_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = DEFAULT_FRONTEND_ORIGINS
        .into_iter()
        .chain(frontend_origin)
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid frontend origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Serve the API until Ctrl+C
pub async fn start_server(engine: Arc<RagEngine>, config: &ServerConfig) -> anyhow::Result<()> {
    engine.warmup().await;

    let app = create_app(engine, config.frontend_origin.as_deref());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "RAG Chat Backend",
        "status": "ok",
        "health": "/health",
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn warmup_handler(State(engine): State<Arc<RagEngine>>) -> Json<Value> {
    let report = engine.warmup().await;
    Json(json!({
        "status": "warmed",
        "collection_ready": report.collection_ready,
        "providers": report.providers,
    }))
}

async fn chat_handler(
    State(engine): State<Arc<RagEngine>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;

    let session_id = request
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID);
    let provider = request.provider.unwrap_or_default();

    let reply = engine.chat(&request.message, session_id, provider).await?;
    Ok(Json(ChatResponse {
        answer: reply.answer,
    }))
}

async fn chat_debug_handler(
    State(engine): State<Arc<RagEngine>>,
    payload: Result<Json<DebugRequest>, JsonRejection>,
) -> Result<Json<DebugResponse>, AppError> {
    let Json(request) = payload?;
    let chunks = engine.retrieved_chunks(&request.message).await?;
    Ok(Json(DebugResponse { chunks }))
}
