//! Upload, retrieval and folder administration.
//!
//! [`Library`] is the one entry point the HTTP layer and the CLI talk to.
//! It coordinates the catalog, the folder tree and the listing engine, and
//! translates their errors into the four outcomes callers care about.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::fs::File;
use tracing::{info, warn};

use crate::catalog::{CatalogBackend, CatalogError, CatalogStore, JsonlCatalog, MemoryCatalog};
use crate::folders::FolderTree;
use crate::models::{
    Category, CategoryKind, EntityId, FolderItem, Pdf, PdfFilter, PdfType, PdfUpdate,
    PDF_MIME_TYPE,
};
use crate::normalize::{
    display_name_from_filename, is_pdf_filename, is_valid_grade, sanitize_filename, valid_subjects,
    Normalizer,
};
use crate::reconcile::Reconciler;
use crate::storage::{StorageConfig, StorageError};

/// Accepted range for a PDF's year.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Errors returned to callers of the library.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for LibraryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PathNotFound(_) => LibraryError::NotFound("File not found".to_string()),
            StorageError::InvalidPath(msg) => LibraryError::BadRequest(msg),
            StorageError::NotEmpty(path) => {
                LibraryError::Conflict(format!("Folder is not empty: {}", path.display()))
            }
            StorageError::AlreadyExists(path) => LibraryError::Conflict(format!(
                "A file named {:?} already exists",
                path.file_name().unwrap_or_default()
            )),
            other => LibraryError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for LibraryError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(msg) => LibraryError::NotFound(msg),
            CatalogError::Conflict(msg) => LibraryError::Conflict(msg),
            CatalogError::InvalidInput(msg) => LibraryError::BadRequest(msg),
            CatalogError::Storage(e) => e.into(),
        }
    }
}

/// Fields shared by single and batch uploads.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub pdf_type: PdfType,
    pub grade: String,
    pub subject: String,
    pub medium: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
}

/// One uploaded file as received from the transport.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Outcome of one item in a batch call.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<Pdf>,
}

impl BatchItem {
    fn failed(name: &str, err: LibraryError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            message: err.to_string(),
            folders: Vec::new(),
            pdf: None,
        }
    }
}

/// Aggregate of a batch call. Individual failures never abort siblings.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub total: usize,
    pub results: Vec<BatchItem>,
}

impl BatchOutcome {
    fn from_results(results: Vec<BatchItem>) -> Self {
        Self {
            success_count: results.iter().filter(|r| r.success).count(),
            total: results.len(),
            results,
        }
    }

    /// A batch counts as successful when at least one item succeeded.
    pub fn is_successful(&self) -> bool {
        self.success_count > 0
    }
}

/// Folders provisioned for an entity.
#[derive(Debug, Clone, Serialize)]
pub struct Provisioned {
    #[serde(flatten)]
    pub entity: Category,
    /// Newly created directories, relative to the storage root
    pub folders: Vec<String>,
}

/// An open file ready to be streamed to a client.
#[derive(Debug)]
pub struct PdfStream {
    pub file: File,
    pub size: u64,
    pub filename: String,
}

/// A file removed through its path under the storage root.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedFile {
    /// Relative to the storage root
    pub path: String,
    /// The row that pointed at the file, removed with it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<Pdf>,
}

/// Disagreements between the catalog and the folder tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    /// Rows whose file is missing
    pub orphaned_rows: Vec<Pdf>,
    /// Files under the tree with no row, relative to the storage root
    pub untracked_files: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned_rows.is_empty() && self.untracked_files.is_empty()
    }
}

static LAST_TOKEN: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp, bumped so that no two calls in this process share one.
fn unique_token() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_TOKEN.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TOKEN.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Stored filename for an upload: sanitized, `.pdf`-suffixed, token-prefixed.
fn stored_filename(original: &str, token: i64) -> Result<String, LibraryError> {
    let mut sanitized = sanitize_filename(original);
    if sanitized.is_empty() {
        return Err(LibraryError::BadRequest(format!(
            "Filename {:?} is not usable",
            original
        )));
    }
    if !is_pdf_filename(&sanitized) {
        sanitized.push_str(".pdf");
    }
    Ok(format!("{}-{}", token, sanitized))
}

fn check_grade(grade: &str) -> Result<(), LibraryError> {
    if !is_valid_grade(grade) {
        return Err(LibraryError::BadRequest(format!("Invalid grade \"{}\"", grade.trim())));
    }
    Ok(())
}

fn check_year(year: Option<i32>) -> Result<(), LibraryError> {
    match year {
        Some(y) if !YEAR_RANGE.contains(&y) => Err(LibraryError::BadRequest(format!(
            "Year must be between {} and {}",
            YEAR_RANGE.start(),
            YEAR_RANGE.end()
        ))),
        _ => Ok(()),
    }
}

/// Catalog plus folder tree.
#[derive(Clone)]
pub struct Library {
    catalog: CatalogStore,
    folders: FolderTree,
    reconciler: Reconciler,
}

impl Library {
    pub fn new(backend: Arc<dyn CatalogBackend>, normalizer: Normalizer, storage_root: PathBuf) -> Self {
        let folders = FolderTree::new(storage_root);
        let catalog = CatalogStore::new(backend, normalizer, folders.clone());
        let reconciler = Reconciler::new(catalog.clone(), folders.clone());
        Self {
            catalog,
            folders,
            reconciler,
        }
    }

    /// Library over the JSONL catalog in `storage.catalog_dir`.
    pub fn open(storage: &StorageConfig, normalizer: Normalizer) -> Result<Self, LibraryError> {
        let backend = JsonlCatalog::open(storage.clone())?;
        Ok(Self::new(
            Arc::new(backend),
            normalizer,
            storage.storage_root.clone(),
        ))
    }

    /// Library with an in-memory catalog.
    pub fn in_memory(storage_root: PathBuf, normalizer: Normalizer) -> Self {
        Self::new(Arc::new(MemoryCatalog::new()), normalizer, storage_root)
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn folders(&self) -> &FolderTree {
        &self.folders
    }

    pub fn listings(&self) -> &Reconciler {
        &self.reconciler
    }

    fn display(&self, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                self.folders
                    .relative_path(p)
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect()
    }

    // Catalog administration

    pub async fn create_category(
        &self,
        kind: CategoryKind,
        name: &str,
        description: Option<String>,
    ) -> Result<Category, LibraryError> {
        Ok(self.catalog.create(kind, name, description).await?)
    }

    pub async fn list_categories(&self, kind: CategoryKind) -> Result<Vec<Category>, LibraryError> {
        Ok(self.catalog.list(kind).await?)
    }

    pub async fn delete_category(&self, kind: CategoryKind, id: &EntityId) -> Result<Category, LibraryError> {
        Ok(self.catalog.delete(kind, id).await?)
    }

    /// Insert the default mediums if they are missing.
    pub async fn seed_mediums(&self, names: &[String]) -> Result<Vec<Category>, LibraryError> {
        Ok(self.catalog.seed(CategoryKind::Medium, names).await?)
    }

    // Folder administration

    /// Find or create a grade and provision its folder for one type.
    pub async fn create_grade_folder(
        &self,
        pdf_type: PdfType,
        grade: &str,
    ) -> Result<Provisioned, LibraryError> {
        check_grade(grade)?;
        let entity = self.catalog.find_or_create(CategoryKind::Grade, grade).await?;
        let created = self.folders.ensure_grade_folder(pdf_type, &entity.slug).await?;
        Ok(Provisioned {
            folders: self.display(&created),
            entity,
        })
    }

    pub async fn create_grade_folders(&self, pdf_type: PdfType, grades: &[String]) -> BatchOutcome {
        let mut results = Vec::with_capacity(grades.len());
        for grade in grades {
            let item = match self.create_grade_folder(pdf_type, grade).await {
                Ok(done) => BatchItem {
                    name: grade.clone(),
                    success: true,
                    message: format!("{} folder created for grade \"{}\"", pdf_type, grade),
                    folders: done.folders,
                    pdf: None,
                },
                Err(e) => {
                    warn!("Failed to create {} folder for grade {:?}: {}", pdf_type, grade, e);
                    BatchItem::failed(grade, e)
                }
            };
            results.push(item);
        }
        BatchOutcome::from_results(results)
    }

    /// Find or create a grade and a subject and provision the subject folder
    /// under both types.
    pub async fn create_subject_folder(
        &self,
        grade: &str,
        subject: &str,
    ) -> Result<Provisioned, LibraryError> {
        let grade = self.catalog.find_or_create(CategoryKind::Grade, grade).await?;
        let entity = self.catalog.find_or_create(CategoryKind::Subject, subject).await?;
        if !valid_subjects().contains(&entity.slug.as_str()) {
            info!("Subject {:?} is outside the known subject list", entity.slug);
        }
        let created = self
            .folders
            .ensure_subject_folder(&grade.slug, &entity.slug)
            .await?;
        Ok(Provisioned {
            folders: self.display(&created),
            entity,
        })
    }

    /// The grade is resolved once up front; its failure fails the whole call.
    pub async fn create_subject_folders(
        &self,
        grade: &str,
        subjects: &[String],
    ) -> Result<BatchOutcome, LibraryError> {
        check_grade(grade)?;
        self.catalog.find_or_create(CategoryKind::Grade, grade).await?;

        let mut results = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let item = match self.create_subject_folder(grade, subject).await {
                Ok(done) => BatchItem {
                    name: subject.clone(),
                    success: true,
                    message: format!("Subject \"{}\" created for grade \"{}\"", subject, grade),
                    folders: done.folders,
                    pdf: None,
                },
                Err(e) => {
                    warn!("Failed to create subject {:?} for grade {:?}: {}", subject, grade, e);
                    BatchItem::failed(subject, e)
                }
            };
            results.push(item);
        }
        Ok(BatchOutcome::from_results(results))
    }

    async fn resolve(&self, kind: CategoryKind, name: &str) -> Result<Category, LibraryError> {
        self.catalog
            .find_by_name(kind, name)
            .await?
            .ok_or_else(|| LibraryError::NotFound(format!("{} \"{}\" not found", kind.label(), name)))
    }

    /// Remove a grade's folders from both types. Rows are left alone.
    pub async fn delete_grade_folders(&self, grade: &str) -> Result<Vec<String>, LibraryError> {
        let entity = self.resolve(CategoryKind::Grade, grade).await?;
        match self.folders.delete_grade_folders(&entity.slug).await {
            Ok(removed) => Ok(self.display(&removed)),
            Err(StorageError::NotEmpty(_)) => Err(LibraryError::Conflict(
                "Cannot delete grade folders: folders contain subjects or files".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_subject_folders(
        &self,
        grade: &str,
        subject: &str,
    ) -> Result<Vec<String>, LibraryError> {
        let grade = self.resolve(CategoryKind::Grade, grade).await?;
        let subject = self.resolve(CategoryKind::Subject, subject).await?;
        match self
            .folders
            .delete_subject_folders(&grade.slug, &subject.slug)
            .await
        {
            Ok(removed) => Ok(self.display(&removed)),
            Err(StorageError::NotEmpty(_)) => Err(LibraryError::Conflict(
                "Cannot delete subject folders: folders contain PDF files".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Subject folder names under a grade, across both types.
    pub async fn list_subject_folders(&self, grade: &str) -> Result<Vec<String>, LibraryError> {
        let grade = self.resolve(CategoryKind::Grade, grade).await?;
        let mut names = Vec::new();
        for pdf_type in PdfType::ALL {
            names.extend(
                self.folders
                    .list_dirs(&self.folders.grade_dir(pdf_type, &grade.slug))
                    .await?,
            );
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn list_types(&self) -> Result<Vec<FolderItem>, LibraryError> {
        Ok(self.folders.list_types().await?)
    }

    // Uploads

    /// Store one PDF and record it.
    ///
    /// Everything that can be checked without touching storage is checked
    /// first. Grade, subject and medium rows created along the way are kept
    /// even if a later step fails.
    pub async fn upload(
        &self,
        target: &UploadTarget,
        name: &str,
        file: UploadFile,
    ) -> Result<Pdf, LibraryError> {
        if file.content_type != PDF_MIME_TYPE {
            return Err(LibraryError::BadRequest("Only PDF files are allowed".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(LibraryError::BadRequest("PDF file is required".to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::BadRequest("PDF name is required".to_string()));
        }
        check_year(target.year)?;
        let filename = stored_filename(&file.original_name, unique_token())?;

        let grade = self
            .catalog
            .find_or_create(CategoryKind::Grade, &target.grade)
            .await?;
        let subject = self
            .catalog
            .find_or_create(CategoryKind::Subject, &target.subject)
            .await?;
        let medium = match target.medium.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => {
                Some(self.catalog.find_or_create(CategoryKind::Medium, m).await?)
            }
            _ => None,
        };

        self.folders
            .ensure_subject_folder(&grade.slug, &subject.slug)
            .await?;
        if let Some(ref medium) = medium {
            self.folders
                .ensure_medium_folder(target.pdf_type, &grade.slug, &subject.slug, &medium.slug)
                .await?;
        }

        let dir = self.folders.leaf_dir(
            target.pdf_type,
            &grade.slug,
            &subject.slug,
            medium.as_ref().map(|m| m.slug.as_str()),
        );
        let path = dir.join(&filename);
        self.folders.write_new_file(&path, &file.bytes).await?;

        let pdf = Pdf::new(
            name.to_string(),
            filename,
            path.clone(),
            target.pdf_type,
            file.bytes.len() as u64,
            grade.id,
            subject.id,
        )
        .with_medium(medium.map(|m| m.slug))
        .with_description(target.description.clone())
        .with_year(target.year);

        match self.catalog.create_pdf(pdf).await {
            Ok(pdf) => {
                info!("Uploaded {:?} to {:?}", pdf.name, pdf.file_path);
                Ok(pdf)
            }
            Err(e) => {
                // A file without a row would only show up as drift
                if let Err(cleanup) = self.folders.remove_file(&path).await {
                    warn!("Failed to remove {:?} after failed insert: {}", path, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Store several PDFs sharing one target.
    ///
    /// `names` and `files` pair up by position; a length mismatch is rejected
    /// before anything is written.
    pub async fn upload_many(
        &self,
        target: &UploadTarget,
        names: &[String],
        files: Vec<UploadFile>,
    ) -> Result<BatchOutcome, LibraryError> {
        if files.is_empty() {
            return Err(LibraryError::BadRequest("At least one PDF file is required".to_string()));
        }
        if names.len() != files.len() {
            return Err(LibraryError::BadRequest(format!(
                "Number of names ({}) must match number of files ({})",
                names.len(),
                files.len()
            )));
        }
        check_year(target.year)?;

        let mut results = Vec::with_capacity(files.len());
        for (name, file) in names.iter().zip(files) {
            let item = match self.upload(target, name, file).await {
                Ok(pdf) => BatchItem {
                    name: name.clone(),
                    success: true,
                    message: "PDF uploaded successfully".to_string(),
                    folders: Vec::new(),
                    pdf: Some(pdf),
                },
                Err(e) => {
                    warn!("Upload of {:?} failed: {}", name, e);
                    BatchItem::failed(name, e)
                }
            };
            results.push(item);
        }
        Ok(BatchOutcome::from_results(results))
    }

    // Retrieval

    /// Open the file behind a PDF row.
    pub async fn stream_by_id(&self, id: &EntityId) -> Result<PdfStream, LibraryError> {
        let pdf = self.catalog.find_pdf(id).await?;
        let (file, size) = match self.folders.open(&pdf.file_path).await {
            Ok(opened) => opened,
            Err(StorageError::PathNotFound(_)) => {
                warn!("PDF {} points at missing file {:?}", pdf.id, pdf.file_path);
                return Err(LibraryError::NotFound(format!(
                    "PDF {} exists in the catalog but its file is missing",
                    pdf.id
                )));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(PdfStream {
            file,
            size,
            filename: format!("{}.pdf", display_name_from_filename(&pdf.filename)),
        })
    }

    /// Open a file by its path relative to the storage root. Files with no
    /// catalog row are served too.
    pub async fn stream_by_path(&self, relative: &str) -> Result<PdfStream, LibraryError> {
        let path = self.folders.resolve_safe_path(relative).await?;
        let (file, size) = self.folders.open(&path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(PdfStream { file, size, filename })
    }

    // PDF maintenance

    /// Delete the row, then its file, then a medium folder left empty.
    pub async fn delete_pdf(&self, id: &EntityId) -> Result<Pdf, LibraryError> {
        let pdf = self.catalog.delete_pdf(id).await?;

        if !pdf.file_path.starts_with(self.folders.root()) {
            warn!("Not removing {:?}: outside the storage root", pdf.file_path);
            return Ok(pdf);
        }
        if !self.folders.remove_file(&pdf.file_path).await? {
            warn!("File for deleted PDF {} was already missing: {:?}", pdf.id, pdf.file_path);
        }
        if pdf.medium.is_some() {
            if let Some(dir) = pdf.file_path.parent() {
                self.prune_medium_dir(dir).await;
            }
        }
        Ok(pdf)
    }

    /// Delete a file by its path relative to the storage root.
    ///
    /// Files discovered on disk have no row and can only be removed this
    /// way. A tracked file goes through [`Library::delete_pdf`] so its row
    /// does not outlive it.
    pub async fn delete_by_path(&self, relative: &str) -> Result<RemovedFile, LibraryError> {
        let path = self.folders.resolve_safe_path(relative).await?;
        let is_pdf = path
            .file_name()
            .map(|n| is_pdf_filename(&n.to_string_lossy()))
            .unwrap_or(false);
        if !is_pdf {
            return Err(LibraryError::BadRequest("Only PDF files can be deleted".to_string()));
        }
        let display = self
            .folders
            .relative_path(&path)
            .unwrap_or_else(|| relative.to_string());

        let rows = self.catalog.find_pdf_rows(&PdfFilter::default()).await?;
        if let Some(row) = rows.into_iter().find(|r| r.file_path == path) {
            let pdf = self.delete_pdf(&row.id).await?;
            return Ok(RemovedFile {
                path: display,
                pdf: Some(pdf),
            });
        }

        if !self.folders.remove_file(&path).await? {
            return Err(LibraryError::NotFound(format!("File not found: {}", display)));
        }
        if let Some(dir) = path.parent() {
            if self.folders.is_medium_dir(dir) {
                self.prune_medium_dir(dir).await;
            }
        }
        Ok(RemovedFile {
            path: display,
            pdf: None,
        })
    }

    async fn prune_medium_dir(&self, dir: &Path) {
        if self.folders.prune_if_empty(dir).await {
            info!("Removed empty medium folder {:?}", dir);
        }
    }

    pub async fn update_pdf(&self, id: &EntityId, update: &PdfUpdate) -> Result<Pdf, LibraryError> {
        if matches!(update.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(LibraryError::BadRequest("PDF name must not be empty".to_string()));
        }
        check_year(update.year)?;
        Ok(self.catalog.update_pdf(id, update).await?)
    }

    /// Compare every PDF row with every file in the tree.
    pub async fn check_drift(&self) -> Result<DriftReport, LibraryError> {
        let rows = self.catalog.find_pdf_rows(&PdfFilter::default()).await?;
        let files = self.folders.list_all_pdf_files().await?;

        let mut report = DriftReport::default();
        for row in &rows {
            if !self.folders.file_exists(&row.file_path).await {
                report.orphaned_rows.push(row.clone());
            }
        }
        for file in files {
            if rows.iter().any(|r| r.file_path == file.full_path) {
                continue;
            }
            if let Some(rel) = self.folders.relative_path(&file.full_path) {
                report.untracked_files.push(rel);
            }
        }
        report.untracked_files.sort();
        Ok(report)
    }
}
