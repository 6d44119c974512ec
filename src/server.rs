//! HTTP server for document upload and chat.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload/` | Multipart upload (field `file`), indexed before responding |
//! | `POST` | `/chat/` | `{"question": "..."}` → answer plus source metadata |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/upload` and `/chat` are accepted without the trailing slash as well.
//!
//! # Error Contract
//!
//! ```json
//! { "error": "Unsupported file format: .txt" }
//! ```
//!
//! Status codes: 400 for unsupported formats and malformed requests, 502 when
//! the language model fails, 500 for everything else.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends on
//! any host can call the API.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::RagError;
use crate::llm::require_api_key;
use crate::models::Answer;
use crate::pipeline::RagPipeline;

/// Build the pipeline from `config`, bind `[server].bind`, and serve until
/// the process is terminated.
///
/// Refuses to start without the language-model credential.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    require_api_key(&config.llm)?;
    let bind_addr = config.server.bind.clone();
    let max_upload_bytes = config.server.max_upload_bytes;
    let pipeline = Arc::new(RagPipeline::from_config(config.clone()).await?);

    let app = router(pipeline, max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Context AI server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// All routes, with CORS and the upload size limit applied.
pub fn router(pipeline: Arc<RagPipeline>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload/", post(handle_upload))
        .route("/upload", post(handle_upload))
        .route("/chat/", post(handle_chat))
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(pipeline)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Converts a [`RagError`] into a JSON error response.
struct AppError(RagError);

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RagError::InvalidRequest(rejection.body_text()))
    }
}

fn status_for(err: &RagError) -> StatusCode {
    match err {
        RagError::UnsupportedFormat(_) | RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RagError::Generation(_) => StatusCode::BAD_GATEWAY,
        RagError::SaveFailure(_)
        | RagError::Extraction(_)
        | RagError::Indexing(_)
        | RagError::Retrieval(_)
        | RagError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        } else {
            tracing::warn!(code = self.0.code(), error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /upload/ ============

#[derive(Serialize)]
struct UploadResponse {
    status: String,
    chunks: usize,
}

/// Saves and indexes the multipart field named `file`.
///
/// Responds only after the document's chunks are searchable.
async fn handle_upload(
    State(pipeline): State<Arc<RagPipeline>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RagError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| RagError::InvalidRequest("file field has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| RagError::InvalidRequest(format!("failed to read upload: {}", e)))?;

        let report = pipeline.ingest_upload(&filename, bytes.to_vec()).await?;
        return Ok(Json(UploadResponse {
            status: "success".to_string(),
            chunks: report.chunks,
        }));
    }

    Err(RagError::InvalidRequest("missing multipart field 'file'".to_string()).into())
}

// ============ POST /chat/ ============

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

async fn handle_chat(
    State(pipeline): State<Arc<RagPipeline>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let Json(req) = payload?;
    let answer = pipeline.ask(&req.question).await?;
    Ok(Json(answer))
}
