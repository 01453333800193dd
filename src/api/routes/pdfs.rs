//! Upload, streaming and maintenance endpoints for PDFs.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::{parse_type, ApiError, ApiResponse};
use crate::library::{BatchOutcome, PdfStream, RemovedFile, UploadFile, UploadTarget};
use crate::models::{EntityId, Pdf, PdfUpdate, PDF_MIME_TYPE};

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
}

/// Text fields shared by both upload endpoints.
#[derive(Debug, Default)]
struct UploadForm {
    pdf_type: Option<String>,
    grade: Option<String>,
    subject: Option<String>,
    medium: Option<String>,
    description: Option<String>,
    year: Option<String>,
    names: Vec<String>,
    files: Vec<UploadFile>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "file" || name == "files" {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.files.push(UploadFile {
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
                continue;
            }

            let value = field.text().await.map_err(multipart_error)?;
            match name.as_str() {
                "type" => form.pdf_type = Some(value),
                "grade" => form.grade = Some(value),
                "subject" => form.subject = Some(value),
                "medium" => form.medium = Some(value),
                "description" => form.description = Some(value),
                "year" => form.year = Some(value),
                "name" | "names" | "names[]" => form.names.extend(parse_names(&value)?),
                other => debug!("Ignoring unknown upload field {:?}", other),
            }
        }
        Ok(form)
    }

    fn target(&self) -> Result<UploadTarget, ApiError> {
        let pdf_type = parse_type(required(&self.pdf_type, "type")?)?;
        let grade = required(&self.grade, "grade")?.to_string();
        let subject = required(&self.subject, "subject")?.to_string();
        let year = match self.year.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<i32>().map_err(|_| {
                ApiError::BadRequest(format!("Year must be a number, got {:?}", raw))
            })?),
            _ => None,
        };
        Ok(UploadTarget {
            pdf_type,
            grade,
            subject,
            medium: non_blank(&self.medium),
            description: non_blank(&self.description),
            year,
        })
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Field \"{}\" is required", field)))
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A `names` field is either one name or a JSON array of names.
fn parse_names(value: &str) -> Result<Vec<String>, ApiError> {
    if value.trim_start().starts_with('[') {
        return serde_json::from_str(value)
            .map_err(|e| ApiError::BadRequest(format!("names must be a JSON array of strings: {}", e)));
    }
    Ok(vec![value.to_string()])
}

/// POST /api/pdfs/upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Pdf>>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let target = form.target()?;
    let name = form.names.first().cloned().unwrap_or_default();
    let file = match form.files.len() {
        0 => return Err(ApiError::BadRequest("PDF file is required".to_string())),
        1 => form.files.remove(0),
        n => {
            return Err(ApiError::BadRequest(format!(
                "Expected one file, got {}; use /api/pdfs/upload-many",
                n
            )))
        }
    };

    let pdf = state.library.upload(&target, &name, file).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::content("PDF uploaded successfully", pdf)),
    ))
}

/// POST /api/pdfs/upload-many
pub async fn upload_many(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let target = form.target()?;

    let outcome = state
        .library
        .upload_many(&target, &form.names, form.files)
        .await?;
    info!(
        "Batch upload to {}/{}/{}: {}/{} stored",
        target.pdf_type, target.grade, target.subject, outcome.success_count, outcome.total
    );

    let message = format!(
        "{} of {} PDFs uploaded successfully",
        outcome.success_count, outcome.total
    );
    let ok = outcome.is_successful();
    Ok(Json(ApiResponse::content(message, outcome).successful(ok)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Keep a filename usable inside a quoted header parameter.
fn header_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect()
}

fn pdf_response(stream: PdfStream, disposition: Disposition) -> Response {
    let content_disposition = HeaderValue::from_str(&format!(
        "{}; filename=\"{}\"",
        disposition.as_str(),
        header_filename(&stream.filename)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(disposition.as_str()));

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(PDF_MIME_TYPE)),
        (header::CONTENT_LENGTH, HeaderValue::from(stream.size)),
        (header::CONTENT_DISPOSITION, content_disposition),
    ];
    let body = Body::from_stream(ReaderStream::new(stream.file));
    (headers, body).into_response()
}

async fn stream_id(state: &AppState, id: String, disposition: Disposition) -> Result<Response, ApiError> {
    let stream = state.library.stream_by_id(&EntityId::from(id)).await?;
    Ok(pdf_response(stream, disposition))
}

/// GET /api/pdfs/:id/view
pub async fn view(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    stream_id(&state, id, Disposition::Inline).await
}

/// GET /api/pdfs/:id/download
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    stream_id(&state, id, Disposition::Attachment).await
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

impl PathQuery {
    fn required(self) -> Result<String, ApiError> {
        self.path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Query parameter \"path\" is required".to_string()))
    }
}

async fn stream_path(
    state: &AppState,
    query: PathQuery,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let stream = state.library.stream_by_path(&query.required()?).await?;
    Ok(pdf_response(stream, disposition))
}

/// GET /api/pdfs/file/view?path=
pub async fn view_by_path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    stream_path(&state, query, Disposition::Inline).await
}

/// GET /api/pdfs/file/download?path=
pub async fn download_by_path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    stream_path(&state, query, Disposition::Attachment).await
}

/// DELETE /api/pdfs/file?path=
pub async fn remove_by_path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<RemovedFile>>, ApiError> {
    let removed = state.library.delete_by_path(&query.required()?).await?;
    Ok(Json(ApiResponse::content("File deleted successfully", removed)))
}

/// PATCH /api/pdfs/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PdfUpdate>,
) -> Result<Json<ApiResponse<Pdf>>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }
    let pdf = state.library.update_pdf(&EntityId::from(id), &update).await?;
    Ok(Json(ApiResponse::content("PDF updated successfully", pdf)))
}

/// DELETE /api/pdfs/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Pdf>>, ApiError> {
    let pdf = state.library.delete_pdf(&EntityId::from(id)).await?;
    Ok(Json(ApiResponse::content("PDF deleted successfully", pdf)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use axum::http::{Method, Request};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::util::ServiceExt;

    const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

    fn single_upload<'a>(name: &'a str, medium: &'a str) -> Vec<Part<'a>> {
        vec![
            Part::Text("type", "syllabus"),
            Part::Text("grade", "Grade 6"),
            Part::Text("subject", "Maths"),
            Part::Text("medium", medium),
            Part::Text("name", name),
            Part::Text("year", "2024"),
            Part::File("file", "Unit 1.pdf", "application/pdf", PDF_BYTES),
        ]
    }

    async fn raw_get(state: &AppState, uri: &str) -> Response {
        app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_header_filename() {
        assert_eq!(header_filename("Unit \"1\".pdf"), "Unit _1_.pdf");
        assert_eq!(header_filename("ගණිතය.pdf"), "_____.pdf");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_names("Paper 1").unwrap(), vec!["Paper 1"]);
        assert_eq!(parse_names(r#"["A", "B"]"#).unwrap(), vec!["A", "B"]);
        assert!(parse_names("[broken").is_err());
    }

    #[tokio::test]
    async fn test_upload_then_view_and_download() {
        let (tmp, state) = setup_test_state();

        let (status, json) =
            post_multipart(app(&state), "/api/pdfs/upload", &single_upload("Unit 1", "English")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["content"]["name"], "Unit 1");
        assert_eq!(json["content"]["medium"], "english");
        assert_eq!(json["content"]["year"], 2024);
        let id = json["content"]["id"].as_str().unwrap().to_string();
        let filename = json["content"]["filename"].as_str().unwrap().to_string();
        assert!(tmp
            .path()
            .join("storage/syllabus/grade-06/mathematics/english")
            .join(&filename)
            .is_file());

        let resp = raw_get(&state, &format!("/api/pdfs/{}/view", id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            resp.headers()[header::CONTENT_LENGTH],
            PDF_BYTES.len().to_string().as_str()
        );
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"Unit 1.pdf\""
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], PDF_BYTES);

        let resp = raw_get(&state, &format!("/api/pdfs/{}/download", id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment;"));

        let path = format!("syllabus/grade-06/mathematics/english/{}", filename).replace(' ', "%20");
        let resp = raw_get(&state, &format!("/api/pdfs/file/download?path={}", path)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"{}\"", filename).as_str()
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (tmp, state) = setup_test_state();
        let parts = vec![
            Part::Text("type", "syllabus"),
            Part::Text("grade", "Grade 6"),
            Part::Text("subject", "Maths"),
            Part::Text("name", "Notes"),
            Part::File("file", "notes.txt", "text/plain", b"hello"),
        ];

        let (status, json) = post_multipart(app(&state), "/api/pdfs/upload", &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "Only PDF files are allowed");
        assert!(!tmp.path().join("storage").exists());
    }

    #[tokio::test]
    async fn test_upload_requires_fields() {
        let (_tmp, state) = setup_test_state();

        let parts = vec![
            Part::Text("type", "syllabus"),
            Part::Text("subject", "Maths"),
            Part::Text("name", "Notes"),
            Part::File("file", "a.pdf", "application/pdf", PDF_BYTES),
        ];
        let (status, json) = post_multipart(app(&state), "/api/pdfs/upload", &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "Field \"grade\" is required");

        let parts = vec![
            Part::Text("type", "syllabus"),
            Part::Text("grade", "Grade 6"),
            Part::Text("subject", "Maths"),
            Part::Text("name", "Notes"),
            Part::Text("year", "last year"),
            Part::File("file", "a.pdf", "application/pdf", PDF_BYTES),
        ];
        let (status, _) = post_multipart(app(&state), "/api/pdfs/upload", &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let parts = vec![
            Part::Text("type", "syllabus"),
            Part::Text("grade", "Grade 6"),
            Part::Text("subject", "Maths"),
            Part::Text("name", "Notes"),
        ];
        let (status, json) = post_multipart(app(&state), "/api/pdfs/upload", &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "PDF file is required");
    }

    #[tokio::test]
    async fn test_upload_many_mixed_results() {
        let (_tmp, state) = setup_test_state();
        let parts = vec![
            Part::Text("type", "past-papers"),
            Part::Text("grade", "Grade 11"),
            Part::Text("subject", "History"),
            Part::Text("names", r#"["Term 1", "Term 2"]"#),
            Part::File("files", "t1.pdf", "application/pdf", PDF_BYTES),
            Part::File("files", "t2.docx", "application/msword", b"doc"),
        ];

        let (status, json) = post_multipart(app(&state), "/api/pdfs/upload-many", &parts).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_successful"], true);
        assert_eq!(json["content"]["success_count"], 1);
        assert_eq!(json["content"]["total"], 2);
        assert_eq!(json["content"]["results"][0]["pdf"]["name"], "Term 1");
        assert_eq!(json["content"]["results"][1]["success"], false);
    }

    #[tokio::test]
    async fn test_upload_many_count_mismatch() {
        let (tmp, state) = setup_test_state();
        let parts = vec![
            Part::Text("type", "past-papers"),
            Part::Text("grade", "Grade 11"),
            Part::Text("subject", "History"),
            Part::Text("names", "Only one"),
            Part::File("files", "t1.pdf", "application/pdf", PDF_BYTES),
            Part::File("files", "t2.pdf", "application/pdf", PDF_BYTES),
        ];

        let (status, _) = post_multipart(app(&state), "/api/pdfs/upload-many", &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!tmp.path().join("storage").exists());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (tmp, state) = setup_test_state();
        let (_, json) =
            post_multipart(app(&state), "/api/pdfs/upload", &single_upload("Draft", "Tamil")).await;
        let id = json["content"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/pdfs/{}", id);

        let (status, json) = send_json(
            app(&state),
            Method::PATCH,
            &uri,
            json!({"name": "Final", "description": "Revised"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["content"]["name"], "Final");
        assert_eq!(json["content"]["description"], "Revised");

        let (status, _) = send_json(app(&state), Method::PATCH, &uri, json!({"year": 1800})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(app(&state), Method::PATCH, &uri, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = delete_json(app(&state), &uri).await;
        assert_eq!(status, StatusCode::OK);
        // The emptied medium folder goes with the file
        assert!(!tmp
            .path()
            .join("storage/syllabus/grade-06/mathematics/tamil")
            .exists());

        let (status, _) = delete_json(app(&state), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let resp = raw_get(&state, &format!("{}/view", uri)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_discovered_file_by_path() {
        let (tmp, state) = setup_test_state();
        let dir = tmp.path().join("storage/past-papers/grade-08/history/english");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Old Paper.pdf"), PDF_BYTES).unwrap();
        std::fs::write(tmp.path().join("keep.pdf"), PDF_BYTES).unwrap();

        let (status, json) = delete_json(app(&state), "/api/pdfs/file?path=../keep.pdf").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert!(tmp.path().join("keep.pdf").exists());

        let (status, _) = delete_json(app(&state), "/api/pdfs/file").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = "/api/pdfs/file?path=past-papers/grade-08/history/english/Old%20Paper.pdf";
        let (status, json) = delete_json(app(&state), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["content"],
            json!({"path": "past-papers/grade-08/history/english/Old Paper.pdf"})
        );
        assert!(!dir.exists());
        assert!(tmp.path().join("storage/past-papers/grade-08/history").is_dir());

        let (status, _) = delete_json(app(&state), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_by_path_rejects_traversal() {
        let (_tmp, state) = setup_test_state();

        let resp = raw_get(&state, "/api/pdfs/file/view?path=../../etc/passwd").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = raw_get(&state, "/api/pdfs/file/view").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = raw_get(&state, "/api/pdfs/file/view?path=syllabus/none.pdf").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
