//! HTTP API for the browser frontend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Chat turn, optionally grounded in uploaded documents |
//! | `POST` | `/api/upload` | Multipart upload (field `file`) |
//! | `GET`  | `/api/documents` | List stored originals |
//! | `DELETE` | `/api/documents/{stored_name}` | Delete an original and its chunks |
//! | `GET`  | `/api/models` | Models offered by the completion service |
//! | `GET`  | `/api/health` | Completion-service reachability |
//! | `GET`/`POST` | `/api/notes` | List or create notes |
//! | `PUT`/`DELETE` | `/api/notes/{id}` | Replace or delete a note |
//! | `GET`  | `/api/weather/{city}` | Mock weather report |
//!
//! # Error Contract
//!
//! ```json
//! { "detail": "File type .exe not supported. Allowed: .pdf, .docx, .doc, .txt", "code": "bad_request" }
//! ```
//!
//! `/api/chat`, `/api/models`, and `/api/health` never fail at the protocol
//! level: completion-service problems are reported inside a 200 body.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the frontend can be
//! served from any origin during development.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::{self, ChatRequest, ChatResponse};
use crate::config::Config;
use crate::context::AppContext;
use crate::documents::{DocumentError, DocumentInfo, UploadOutcome};
use crate::notes::{Note, NoteError, NoteInput};
use crate::weather::{self, WeatherReport};

/// Opens the application context and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ctx = AppContext::open(config).await?;
    let bind_addr = config.server.bind.clone();
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "server listening");
    println!("Buddy gateway listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router over an existing context.
pub fn router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = ctx.config.server.max_upload_bytes;

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/upload", post(handle_upload))
        .route("/api/documents", get(handle_list_documents))
        .route("/api/documents/{stored_name}", delete(handle_delete_document))
        .route("/api/models", get(handle_models))
        .route("/api/health", get(handle_health))
        .route("/api/notes", get(handle_list_notes).post(handle_create_note))
        .route(
            "/api/notes/{id}",
            put(handle_update_note).delete(handle_delete_note),
        )
        .route("/api/weather/{city}", get(handle_weather))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    code: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(detail: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        detail: detail.into(),
    }
}

fn not_found(detail: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        detail: detail.into(),
    }
}

fn internal(detail: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        detail: detail.into(),
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        match e.status_code() {
            400 => bad_request(e.to_string()),
            404 => not_found(e.to_string()),
            _ => {
                tracing::error!(error = %e, "document operation failed");
                internal(e.to_string())
            }
        }
    }
}

impl From<NoteError> for AppError {
    fn from(e: NoteError) -> Self {
        match e {
            NoteError::NotFound(_) => not_found(e.to_string()),
            NoteError::EmptyTitle => bad_request(e.to_string()),
            NoteError::Backend(_) => internal(e.to_string()),
        }
    }
}

// ============ POST /api/chat ============

async fn handle_chat(
    State(ctx): State<AppContext>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    Json(chat::respond(&ctx.chat_deps(), &request).await)
}

// ============ Documents ============

async fn handle_upload(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request("file field has no filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("could not read upload: {}", e)))?;

        let outcome = ctx.documents.upload(&filename, bytes.to_vec()).await?;
        return Ok(Json(outcome));
    }
    Err(bad_request("missing multipart field: file"))
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentInfo>,
}

async fn handle_list_documents(
    State(ctx): State<AppContext>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = ctx.documents.list().await?;
    Ok(Json(DocumentListResponse { documents }))
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn handle_delete_document(
    State(ctx): State<AppContext>,
    Path(stored_name): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = ctx.documents.delete(&stored_name).await?;
    Ok(Json(MessageResponse { message }))
}

// ============ GET /api/models, GET /api/health ============

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<String>,
    current_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn handle_models(State(ctx): State<AppContext>) -> Json<ModelsResponse> {
    let default_model = ctx.config.ollama.default_model.clone();
    match ctx.completion.list_models().await {
        Ok(models) => Json(ModelsResponse {
            current_model: models.first().cloned().unwrap_or(default_model),
            models,
            error: None,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "model listing failed");
            Json(ModelsResponse {
                models: Vec::new(),
                current_model: default_model,
                error: Some(e.to_string()),
            })
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    ollama_status: &'static str,
    available_models: Vec<String>,
    current_model: String,
    model_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn handle_health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let default_model = ctx.config.ollama.default_model.clone();
    match ctx.completion.list_models().await {
        Ok(models) => Json(HealthResponse {
            ollama_status: "running",
            current_model: models.first().cloned().unwrap_or(default_model),
            model_available: !models.is_empty(),
            available_models: models,
            error: None,
        }),
        Err(e) => Json(HealthResponse {
            ollama_status: "error",
            available_models: Vec::new(),
            current_model: default_model,
            model_available: false,
            error: Some(e.to_string()),
        }),
    }
}

// ============ Notes ============

#[derive(Serialize)]
struct NoteListResponse {
    notes: Vec<Note>,
}

async fn handle_list_notes(State(ctx): State<AppContext>) -> Result<Json<NoteListResponse>, AppError> {
    let notes = ctx.notes.list().await?;
    Ok(Json(NoteListResponse { notes }))
}

async fn handle_create_note(
    State(ctx): State<AppContext>,
    Json(input): Json<NoteInput>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let note = ctx.notes.add(input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn handle_update_note(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(input): Json<NoteInput>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(ctx.notes.update(&id, input).await?))
}

async fn handle_delete_note(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ctx.notes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ GET /api/weather/{city} ============

async fn handle_weather(Path(city): Path<String>) -> Result<Json<WeatherReport>, AppError> {
    weather::mock_weather(&city)
        .map(Json)
        .map_err(|e| bad_request(e.to_string()))
}
