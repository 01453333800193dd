//! Browsing endpoints.
//!
//! Every listing is the union of what the catalog knows and what the folder
//! tree holds; see [`Reconciler`](crate::reconcile::Reconciler).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{parse_type, ApiError, ApiResponse};
use crate::models::{Category, EntityId, FolderItem, ListedMedium, ListedPdf};

#[derive(Debug, Default, Deserialize)]
pub struct MediumQuery {
    pub medium: Option<String>,
}

impl MediumQuery {
    fn medium(&self) -> Option<&str> {
        self.medium.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// GET /api/types
pub async fn list_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FolderItem>>, ApiError> {
    let types = state.library.list_types().await?;
    Ok(Json(ApiResponse::list("Types retrieved successfully", types)))
}

/// GET /api/users/:type/grades
pub async fn grades(
    State(state): State<AppState>,
    Path(pdf_type): Path<String>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let pdf_type = parse_type(&pdf_type)?;
    let grades = state.library.listings().grades_for_type(pdf_type).await?;
    Ok(Json(ApiResponse::list("Grades retrieved successfully", grades)))
}

/// GET /api/users/:type/:grade_id/subjects
pub async fn subjects(
    State(state): State<AppState>,
    Path((pdf_type, grade_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let pdf_type = parse_type(&pdf_type)?;
    let subjects = state
        .library
        .listings()
        .subjects_for_grade_id(pdf_type, &EntityId::from(grade_id))
        .await?;
    Ok(Json(ApiResponse::list("Subjects retrieved successfully", subjects)))
}

/// GET /api/users/:type/by-name/:grade/subjects
pub async fn subjects_by_name(
    State(state): State<AppState>,
    Path((pdf_type, grade)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let pdf_type = parse_type(&pdf_type)?;
    let subjects = state
        .library
        .listings()
        .subjects_for_grade_name(pdf_type, &grade)
        .await?;
    Ok(Json(ApiResponse::list("Subjects retrieved successfully", subjects)))
}

/// GET /api/users/:type/:grade_id/:subject_id/mediums
pub async fn mediums(
    State(state): State<AppState>,
    Path((pdf_type, grade_id, subject_id)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<ListedMedium>>, ApiError> {
    let pdf_type = parse_type(&pdf_type)?;
    let mediums = state
        .library
        .listings()
        .mediums_for_ids(pdf_type, &EntityId::from(grade_id), &EntityId::from(subject_id))
        .await?;
    Ok(Json(ApiResponse::list("Mediums retrieved successfully", mediums)))
}

/// GET /api/users/:type/:grade_id/:subject_id/pdfs?medium=
pub async fn pdfs(
    State(state): State<AppState>,
    Path((pdf_type, grade_id, subject_id)): Path<(String, String, String)>,
    Query(query): Query<MediumQuery>,
) -> Result<Json<ApiResponse<ListedPdf>>, ApiError> {
    let pdf_type = parse_type(&pdf_type)?;
    let pdfs = state
        .library
        .listings()
        .pdfs_for_ids(
            pdf_type,
            &EntityId::from(grade_id),
            &EntityId::from(subject_id),
            query.medium(),
        )
        .await?;
    Ok(Json(ApiResponse::list("PDFs retrieved successfully", pdfs)))
}

/// GET /api/users/:type/by-name/:grade/:subject/pdfs?medium=
pub async fn pdfs_by_name(
    State(state): State<AppState>,
    Path((pdf_type, grade, subject)): Path<(String, String, String)>,
    Query(query): Query<MediumQuery>,
) -> Result<Json<ApiResponse<ListedPdf>>, ApiError> {
    let pdf_type = parse_type(&pdf_type)?;
    let pdfs = state
        .library
        .listings()
        .pdfs_for_names(pdf_type, &grade, &subject, query.medium())
        .await?;
    Ok(Json(ApiResponse::list("PDFs retrieved successfully", pdfs)))
}
