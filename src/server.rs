//! HTTP event endpoint.
//!
//! Lets producers deliver submission events over HTTP and lets a UI poll
//! the state of the merge queue, a folder's progress, and its documents.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/events?folder=ID` | Enqueue a `MERGE` or apply a `CHECKLIST` event |
//! | `GET`  | `/busy` | Whether a merge drain is in progress |
//! | `GET`  | `/progress/{folder}` | Checklist completion for a folder |
//! | `GET`  | `/documents/{folder}?q=` | Documents of a folder, in chapter order |
//! | `GET`  | `/documents/{folder}/{id}/content` | The assembled DOCX bytes |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "folder not found: x" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based
//! producers on other origins can post events.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use chapter_merge_core::assemble::MIME_DOCX;
use chapter_merge_core::checklist::ChecklistStatus;
use chapter_merge_core::models::ROOT_COLLECTION;

use crate::config::Config;
use crate::db;
use crate::docs::{summarize, DocumentSummary};
use crate::events::InboundEvent;
use crate::ingest::{dispatch, Dispatched};
use crate::queue::MergeQueue;

#[derive(Clone)]
struct AppState {
    queue: MergeQueue,
}

/// Build the router around a running queue.
pub fn router(queue: MergeQueue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/events", post(handle_event))
        .route("/busy", get(handle_busy))
        .route("/progress/{folder}", get(handle_progress))
        .route("/documents/{folder}", get(handle_documents))
        .route("/documents/{folder}/{id}/content", get(handle_content))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { queue })
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until Ctrl-C, then lets the worker finish its current merge.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let library = db::open_shared(config).await?;
    let queue = MergeQueue::start(library, &config.queue).await?;
    let app = router(queue.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Listening on http://{}", config.server.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    queue.shutdown().await;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Library errors naming a missing record map to 404, the rest to 500.
fn classify(err: anyhow::Error) -> AppError {
    let message = format!("{:#}", err);
    if message.contains("not found") {
        not_found(message)
    } else {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

// ============ POST /events ============

#[derive(Deserialize)]
struct FolderQuery {
    folder: Option<String>,
}

async fn handle_event(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, AppError> {
    let event: InboundEvent =
        serde_json::from_value(body).map_err(|e| bad_request(format!("invalid event: {}", e)))?;
    let folder = query.folder.as_deref().unwrap_or(ROOT_COLLECTION);

    match dispatch(&state.queue, folder, event).await.map_err(classify)? {
        Dispatched::Queued => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "status": "queued",
                "outstanding": state.queue.outstanding(),
            })),
        )
            .into_response()),
        Dispatched::Checklist(report) => Ok(Json(serde_json::json!({
            "received": report.received,
            "added": report.added,
            "total": report.total,
            "duplicates": report.duplicates,
            "show_log": report.show_log(),
        }))
        .into_response()),
    }
}

// ============ GET /busy ============

#[derive(Serialize)]
struct BusyResponse {
    busy: bool,
    outstanding: usize,
}

async fn handle_busy(State(state): State<AppState>) -> Json<BusyResponse> {
    Json(BusyResponse {
        busy: state.queue.is_busy(),
        outstanding: state.queue.outstanding(),
    })
}

// ============ GET /progress/{folder} ============

#[derive(Serialize)]
struct ProgressResponse {
    done: usize,
    total: usize,
    percent: f64,
    items: Vec<ChecklistStatus>,
}

async fn handle_progress(
    State(state): State<AppState>,
    Path(folder): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    let library = state.queue.library().lock().await;
    if library.collection(&folder).is_none() {
        return Err(not_found(format!("folder not found: {}", folder)));
    }
    let items = library.checklist_status(&folder);
    let progress = chapter_merge_core::checklist::progress(&items);
    Ok(Json(ProgressResponse {
        done: progress.done,
        total: progress.total,
        percent: progress.percent,
        items,
    }))
}

// ============ GET /documents/{folder} ============

#[derive(Deserialize)]
struct KeywordQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_documents(
    State(state): State<AppState>,
    Path(folder): Path<String>,
    Query(query): Query<KeywordQuery>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let library = state.queue.library().lock().await;
    if library.collection(&folder).is_none() {
        return Err(not_found(format!("folder not found: {}", folder)));
    }
    let documents = library
        .documents(&folder, query.q.as_deref())
        .into_iter()
        .map(summarize)
        .collect();
    Ok(Json(DocumentsResponse { documents }))
}

// ============ GET /documents/{folder}/{id}/content ============

async fn handle_content(
    State(state): State<AppState>,
    Path((folder, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let library = state.queue.library().lock().await;
    let doc = library
        .document(&id)
        .filter(|d| d.collection_id == folder)
        .ok_or_else(|| not_found(format!("document not found: {}", id)))?;

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        percent_encode(&doc.name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, MIME_DOCX.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.rendered_bytes.clone(),
    )
        .into_response())
}

/// RFC 5987 encoding for header parameters.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
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
