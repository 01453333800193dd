//! REST API endpoints.
//!
//! Axum-based HTTP API for folder administration, browsing, uploading and
//! streaming PDFs. Handlers are thin: they parse parameters, call
//! [`Library`](crate::library::Library) and wrap the result.

pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::library::LibraryError;
use crate::models::{PdfType, UnknownPdfType};
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::NotFound(msg) => ApiError::NotFound(msg),
            LibraryError::Conflict(msg) => ApiError::Conflict(msg),
            LibraryError::BadRequest(msg) => ApiError::BadRequest(msg),
            LibraryError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        LibraryError::from(e).into()
    }
}

impl From<UnknownPdfType> for ApiError {
    fn from(e: UnknownPdfType) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Parse the `:type` path segment.
pub fn parse_type(raw: &str) -> Result<PdfType, ApiError> {
    Ok(raw.parse::<PdfType>()?)
}

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T = ()> {
    pub is_successful: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_content: Option<Vec<T>>,
}

impl<T> ApiResponse<T> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            is_successful: true,
            message: message.into(),
            content: None,
            list_content: None,
        }
    }

    pub fn content(message: impl Into<String>, content: T) -> Self {
        Self {
            content: Some(content),
            ..Self::message(message)
        }
    }

    pub fn list(message: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            list_content: Some(items),
            ..Self::message(message)
        }
    }

    pub fn successful(mut self, is_successful: bool) -> Self {
        self.is_successful = is_successful;
        self
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Ignoring invalid CORS origin {:?}, allowing any", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    use routes::{admin, health, pdfs, users};

    let cors = cors_layer(&state.config.server.cors_origin);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health))
        // Folder and catalog administration
        .route(
            "/api/admin/grades",
            post(admin::create_grades).get(admin::list_grades),
        )
        .route("/api/admin/grades/:grade", delete(admin::delete_grade_folders))
        .route("/api/admin/grades/id/:id", delete(admin::delete_grade))
        .route(
            "/api/admin/subjects",
            post(admin::create_subjects).get(admin::list_subjects),
        )
        .route("/api/admin/subjects/:grade", get(admin::list_subject_folders))
        .route("/api/admin/subjects/id/:id", delete(admin::delete_subject))
        .route(
            "/api/admin/subjects/:grade/:subject",
            delete(admin::delete_subject_folders),
        )
        .route(
            "/api/admin/mediums",
            post(admin::create_medium).get(admin::list_mediums),
        )
        .route("/api/admin/mediums/:id", delete(admin::delete_medium))
        // Browsing
        .route("/api/types", get(users::list_types))
        .route("/api/users/:type/grades", get(users::grades))
        .route("/api/users/:type/:grade_id/subjects", get(users::subjects))
        .route(
            "/api/users/:type/by-name/:grade/subjects",
            get(users::subjects_by_name),
        )
        .route(
            "/api/users/:type/:grade_id/:subject_id/mediums",
            get(users::mediums),
        )
        .route("/api/users/:type/:grade_id/:subject_id/pdfs", get(users::pdfs))
        .route(
            "/api/users/:type/by-name/:grade/:subject/pdfs",
            get(users::pdfs_by_name),
        )
        // Files
        .route("/api/pdfs/upload", post(pdfs::upload))
        .route("/api/pdfs/upload-many", post(pdfs::upload_many))
        .route("/api/pdfs/file", delete(pdfs::remove_by_path))
        .route("/api/pdfs/file/view", get(pdfs::view_by_path))
        .route("/api/pdfs/file/download", get(pdfs::download_by_path))
        .route("/api/pdfs/:id/view", get(pdfs::view))
        .route("/api/pdfs/:id/download", get(pdfs::download))
        .route("/api/pdfs/:id", patch(pdfs::update).delete(pdfs::remove))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}
