//! HTTP surface for the single-user extraction session.

use crate::export::{self, EXPORT_FILE_NAME};
use crate::media;
use crate::orchestrator::Orchestrator;
use crate::registry::{DocumentEntry, DocumentId, SourceFile, StatusKind};
use crate::schema::ExtractedData;
use crate::stats::{self, DashboardStats};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/documents", get(list_documents).post(upload_documents))
        .route("/documents/:id", delete(remove_document))
        .route("/documents/:id/preview", get(get_preview))
        .route("/stats", get(get_stats))
        .route("/export", get(export_csv))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail),
            ApiError::PayloadTooLarge(detail) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Views
// ============================================================================

/// One row of the results table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: DocumentId,
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: usize,
    pub size_label: String,
    pub preview_url: Option<String>,
    pub status: StatusKind,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&DocumentEntry> for DocumentView {
    fn from(entry: &DocumentEntry) -> Self {
        let status = entry.status.kind();
        let data = entry.extracted_data().cloned();
        Self {
            id: entry.id.clone(),
            file_name: entry.source.name.clone(),
            media_type: entry.source.media_type.clone(),
            size_bytes: entry.source.size(),
            size_label: format!("{:.1} KB", entry.source.size() as f64 / 1024.0),
            preview_url: entry
                .preview_ref
                .as_ref()
                .map(|_| format!("/documents/{}/preview", entry.id)),
            status,
            status_label: status.label(),
            amount_label: data.as_ref().map(ExtractedData::amount_label),
            data,
            error_message: entry.error_message().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedFile {
    pub id: DocumentId,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub accepted: Vec<AcceptedFile>,
    pub rejected: Vec<RejectedFile>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let detail = format!("Multipart error: {}", err.body_text());
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(detail)
        } else {
            ApiError::BadRequest(detail)
        }
    }
}

/// Accept one or more `file` parts; each supported file becomes an entry
/// and starts processing.
///
/// The whole request is read before anything is registered, so a request
/// that fails partway leaves the session untouched.
async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut sources = Vec::new();
    let mut rejected = Vec::new();
    let mut saw_file = false;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        saw_file = true;

        let file_name = field.file_name().unwrap_or("document").to_string();
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        match media::resolve(declared.as_deref(), &data) {
            Some(media_type) if media::is_supported(&media_type) => {
                info!("Received file: {} ({} bytes, {})", file_name, data.len(), media_type);
                sources.push(SourceFile::new(file_name, media_type, data.to_vec()));
            }
            resolved => {
                let reason = match resolved {
                    Some(media_type) => format!("Unsupported media type: {}", media_type),
                    None => "Unknown media type".to_string(),
                };
                warn!("Rejected file {}: {}", file_name, reason);
                rejected.push(RejectedFile { file_name, reason });
            }
        }
    }

    if !saw_file {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    }

    let accepted: Vec<AcceptedFile> = sources
        .into_iter()
        .map(|source| {
            let file_name = source.name.clone();
            let (id, _task) = state.orchestrator.submit(source);
            AcceptedFile { id, file_name }
        })
        .collect();

    info!(
        "Upload accepted {} / rejected {}; session holds {} documents",
        accepted.len(),
        rejected.len(),
        state.orchestrator.registry().len()
    );

    Ok((StatusCode::ACCEPTED, Json(UploadResponse { accepted, rejected })))
}

async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentView>> {
    let entries = state.orchestrator.registry().list();
    Json(entries.iter().map(DocumentView::from).collect())
}

async fn remove_document(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.orchestrator.registry().remove(&DocumentId::from(id));
    StatusCode::NO_CONTENT
}

async fn get_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let registry = state.orchestrator.registry();
    let preview = registry
        .get(&DocumentId::from(id.clone()))
        .and_then(|entry| entry.preview_ref)
        .and_then(|preview_ref| registry.previews().get(&preview_ref))
        .ok_or_else(|| ApiError::NotFound(format!("No preview for {}", id)))?;

    Ok((
        [(header::CONTENT_TYPE, preview.media_type)],
        Bytes::copy_from_slice(&preview.data),
    )
        .into_response())
}

async fn get_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(stats::dashboard(&state.orchestrator.registry().list()))
}

async fn export_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let entries = state.orchestrator.registry().list();
    if !export::has_rows(&entries) {
        return Err(ApiError::Conflict(
            "No successful extractions to export".to_string(),
        ));
    }

    let csv = export::to_csv(&entries).map_err(|e| ApiError::Internal(format!("{:#}", e)))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        csv,
    )
        .into_response())
}
