//! HTTP API server.
//!
//! Exposes the document and question-answering operations as a JSON API.
//! Every route except `/health` requires `Authorization: Bearer <key>`;
//! `[server.api_keys]` maps each key to the user id it acts as.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/documents` | Upload a document; chunking runs in the background |
//! | `GET`    | `/documents` | List the caller's documents |
//! | `GET`    | `/documents/{id}` | Fetch one document with its chunks |
//! | `DELETE` | `/documents/{id}` | Delete a document and its chunks |
//! | `POST`   | `/documents/{id}/process` | Re-chunk a document |
//! | `POST`   | `/query` | Ask a question over the caller's documents |
//! | `GET`    | `/history` | Recent queries, newest first |
//! | `POST`   | `/run` | Answer a batch of questions over an ad-hoc text |
//! | `POST`   | `/hackrx/run` | Same as `/run`, kept for existing batch clients |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid input: query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `not_found` (404),
//! `no_documents` (422), `upstream` (502), `internal` (500).

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::QaError;
use crate::ingest;
use crate::llm::{self, TextGenerator};
use crate::models::{Document, FileType, NewDocument, QueryRecord};
use crate::qa;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub generator: Arc<dyn TextGenerator>,
}

/// The user a request acts as, resolved from its API key.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Starts the HTTP server on `[server].bind` backed by the SQLite store.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let generator = llm::create_generator(&config.llm)?;

    if config.server.api_keys.is_empty() {
        tracing::warn!("no [server.api_keys] configured; every protected route will return 401");
    }
    if !config.llm.is_enabled() {
        tracing::warn!("llm provider is disabled; /query and /run will return 502");
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
        generator: Arc::from(generator),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    println!("docqa server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with auth, CORS, and request tracing applied.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/documents", get(handle_list_documents).post(handle_upload))
        .route(
            "/documents/{id}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .route("/documents/{id}/process", post(handle_process))
        .route("/query", post(handle_query))
        .route("/history", get(handle_history))
        .route("/run", post(handle_run))
        .route("/hackrx/run", post(handle_run))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handle_health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Authentication ============

/// Resolves `Authorization: Bearer <key>` to a user and stores it as an
/// [`AuthUser`] request extension.
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match header {
        Some(h) if h.starts_with("Bearer ") => h[7..].trim(),
        Some(_) => {
            return unauthorized("Invalid authorization header format. Expected: Bearer <key>")
                .into_response()
        }
        None => return unauthorized("Missing authorization header").into_response(),
    };

    match state.config.server.api_keys.get(token) {
        Some(user) => {
            let user = AuthUser(user.clone());
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => unauthorized("Invalid API key").into_response(),
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Error type that converts into a JSON error response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized",
        message: message.into(),
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            QaError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            QaError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            QaError::EmptyCorpus => (StatusCode::UNPROCESSABLE_ENTITY, "no_documents"),
            QaError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
            QaError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ /documents ============

/// Upload body. Exactly one of `content` (UTF-8 text) or
/// `content_base64` (raw bytes, e.g. a PDF) must be present.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub title: String,
    pub file_type: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub storage_path: Option<String>,
}

impl UploadRequest {
    fn into_new_document(self) -> Result<NewDocument, AppError> {
        let file_type = FileType::parse(&self.file_type)?;
        let bytes = match (self.content, self.content_base64) {
            (Some(text), None) => text.into_bytes(),
            (None, Some(encoded)) => base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?,
            _ => {
                return Err(bad_request(
                    "exactly one of content or content_base64 is required",
                ))
            }
        };
        Ok(NewDocument {
            title: self.title,
            file_type,
            bytes,
            storage_path: self.storage_path,
        })
    }
}

/// Records the document and returns it right away; chunking runs on a
/// spawned task, so the response has `processed_at: null`.
async fn handle_upload(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let upload = req.into_new_document()?;
    let doc = ingest::upload_document(state.store.as_ref(), &user, upload).await?;

    let store = state.store.clone();
    let config = state.config.clone();
    let document_id = doc.id.clone();
    tokio::spawn(async move {
        if let Err(e) =
            ingest::process_document(store.as_ref(), &user, &document_id, &config.chunking).await
        {
            tracing::error!(document_id = %document_id, error = %e, "background processing failed");
        }
    });

    Ok((StatusCode::CREATED, Json(doc)))
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Document>>, AppError> {
    let docs = state
        .store
        .list_documents_for_user(&user)
        .await
        .map_err(QaError::from)?;
    Ok(Json(docs))
}

async fn handle_get_document(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let doc = state
        .store
        .get_document(&user, &id)
        .await
        .map_err(QaError::from)?
        .ok_or(QaError::NotFound(id))?;
    Ok(Json(doc))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ingest::delete_document(state.store.as_ref(), &user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_process(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let doc =
        ingest::process_document(state.store.as_ref(), &user, &id, &state.config.chunking).await?;
    Ok(Json(doc))
}

// ============ POST /query, GET /history ============

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryRecord>, AppError> {
    let record = qa::answer_query(
        state.store.as_ref(),
        state.generator.as_ref(),
        &user,
        &req.query,
        &state.config.retrieval,
    )
    .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

async fn handle_history(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<QueryRecord>>, AppError> {
    let records =
        qa::history(state.store.as_ref(), &user, params.limit, &state.config.history).await?;
    Ok(Json(records))
}

// ============ POST /run ============

/// Batch body: one document text and the questions to answer over it.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub documents: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub answers: Vec<String>,
}

async fn handle_run(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    tracing::info!(user_id = %user, questions = req.questions.len(), "batch run");
    let answers = qa::answer_batch(
        state.generator.as_ref(),
        &req.documents,
        &req.questions,
        &state.config.chunking,
        &state.config.retrieval,
    )
    .await?;
    Ok(Json(RunResponse { answers }))
}
