//! Folder and catalog administration endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::api::state::AppState;
use crate::api::{parse_type, ApiError, ApiResponse};
use crate::library::BatchOutcome;
use crate::models::{Category, CategoryKind, EntityId};

#[derive(Debug, Deserialize)]
pub struct CreateGradesRequest {
    #[serde(rename = "type")]
    pub pdf_type: String,
    pub grades: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubjectsRequest {
    pub grade: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMediumRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn batch_response(outcome: BatchOutcome, what: &str) -> Json<ApiResponse<BatchOutcome>> {
    let message = format!(
        "{} of {} {} created",
        outcome.success_count, outcome.total, what
    );
    let ok = outcome.is_successful();
    Json(ApiResponse::content(message, outcome).successful(ok))
}

fn require_names(names: &[String], what: &str) -> Result<(), ApiError> {
    if names.iter().all(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest(format!("At least one {} is required", what)));
    }
    Ok(())
}

/// POST /api/admin/grades
pub async fn create_grades(
    State(state): State<AppState>,
    Json(req): Json<CreateGradesRequest>,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    let pdf_type = parse_type(&req.pdf_type)?;
    require_names(&req.grades, "grade")?;

    let outcome = state.library.create_grade_folders(pdf_type, &req.grades).await;
    info!(
        "Grade folders for {}: {}/{} created",
        pdf_type, outcome.success_count, outcome.total
    );
    Ok(batch_response(outcome, "grade folders"))
}

/// GET /api/admin/grades
pub async fn list_grades(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let grades = state.library.list_categories(CategoryKind::Grade).await?;
    Ok(Json(ApiResponse::list("Grades retrieved successfully", grades)))
}

/// DELETE /api/admin/grades/:grade
///
/// Removes the grade's folder under every type. The row stays.
pub async fn delete_grade_folders(
    State(state): State<AppState>,
    Path(grade): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let removed = state.library.delete_grade_folders(&grade).await?;
    Ok(Json(ApiResponse::list(
        format!("Grade folders for \"{}\" deleted", grade),
        removed,
    )))
}

/// DELETE /api/admin/grades/id/:id
pub async fn delete_grade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let grade = state
        .library
        .delete_category(CategoryKind::Grade, &EntityId::from(id))
        .await?;
    Ok(Json(ApiResponse::content("Grade deleted successfully", grade)))
}

/// POST /api/admin/subjects
pub async fn create_subjects(
    State(state): State<AppState>,
    Json(req): Json<CreateSubjectsRequest>,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    if req.grade.trim().is_empty() {
        return Err(ApiError::BadRequest("Grade is required".to_string()));
    }
    require_names(&req.subjects, "subject")?;

    let outcome = state
        .library
        .create_subject_folders(&req.grade, &req.subjects)
        .await?;
    Ok(batch_response(outcome, "subjects"))
}

/// GET /api/admin/subjects
pub async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let subjects = state.library.list_categories(CategoryKind::Subject).await?;
    Ok(Json(ApiResponse::list("Subjects retrieved successfully", subjects)))
}

/// GET /api/admin/subjects/:grade
pub async fn list_subject_folders(
    State(state): State<AppState>,
    Path(grade): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let names = state.library.list_subject_folders(&grade).await?;
    Ok(Json(ApiResponse::list(
        format!("Subjects for \"{}\" retrieved successfully", grade),
        names,
    )))
}

/// DELETE /api/admin/subjects/:grade/:subject
pub async fn delete_subject_folders(
    State(state): State<AppState>,
    Path((grade, subject)): Path<(String, String)>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let removed = state
        .library
        .delete_subject_folders(&grade, &subject)
        .await?;
    Ok(Json(ApiResponse::list(
        format!("Subject folders for \"{}\" in \"{}\" deleted", subject, grade),
        removed,
    )))
}

/// DELETE /api/admin/subjects/id/:id
pub async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let subject = state
        .library
        .delete_category(CategoryKind::Subject, &EntityId::from(id))
        .await?;
    Ok(Json(ApiResponse::content("Subject deleted successfully", subject)))
}

/// POST /api/admin/mediums
pub async fn create_medium(
    State(state): State<AppState>,
    Json(req): Json<CreateMediumRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    let medium = state
        .library
        .create_category(CategoryKind::Medium, &req.name, req.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::content("Medium created successfully", medium)),
    ))
}

/// GET /api/admin/mediums
pub async fn list_mediums(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let mediums = state.library.list_categories(CategoryKind::Medium).await?;
    Ok(Json(ApiResponse::list("Mediums retrieved successfully", mediums)))
}

/// DELETE /api/admin/mediums/:id
pub async fn delete_medium(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let medium = state
        .library
        .delete_category(CategoryKind::Medium, &EntityId::from(id))
        .await?;
    Ok(Json(ApiResponse::content("Medium deleted successfully", medium)))
}
