//! Listings that merge catalog rows with the folder tree.
//!
//! Neither source is authoritative. Folders may be created ahead of any
//! upload, and files may be dropped into storage without going through the
//! API, so every listing takes the union of:
//!
//! - entities referenced by PDF rows of the requested type, and
//! - folders found on disk, resolved back to catalog rows by slug,
//!
//! de-duplicated by resolved identity and ordered by display name. Disk is
//! read live on every call; nothing is cached.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::catalog::{CatalogError, CatalogStore};
use crate::folders::{is_folder_segment, FileEntry, FolderTree};
use crate::models::{
    sort_by_name, sort_listed_mediums, sort_listed_pdfs, Category, CategoryKind, DiscoveredFolder,
    DiscoveredPdf, EntityId, Listed, ListedMedium, ListedPdf, PdfFilter, PdfType,
};
use crate::normalize::display_name_from_filename;

/// Append `incoming` rows to `rows`, skipping ids already present.
fn merge_by_id(rows: &mut Vec<Category>, incoming: impl IntoIterator<Item = Category>) {
    let mut seen: HashSet<EntityId> = rows.iter().map(|r| r.id.clone()).collect();
    for row in incoming {
        if seen.insert(row.id.clone()) {
            rows.push(row);
        }
    }
}

/// Dual-source listing over one catalog and one folder tree.
#[derive(Clone)]
pub struct Reconciler {
    catalog: CatalogStore,
    folders: FolderTree,
}

impl Reconciler {
    pub fn new(catalog: CatalogStore, folders: FolderTree) -> Self {
        Self { catalog, folders }
    }

    /// Rows for the given ids. Ids with no row are logged and dropped.
    async fn rows_for_ids(
        &self,
        kind: CategoryKind,
        ids: BTreeSet<EntityId>,
    ) -> Result<Vec<Category>, CatalogError> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            match self.catalog.find_by_id(kind, &id).await {
                Ok(row) => rows.push(row),
                Err(CatalogError::NotFound(_)) => {
                    warn!("PDF rows reference missing {} {}", kind, id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(rows)
    }

    /// Rows whose slug matches a folder name. Unresolved folders are dropped.
    async fn rows_for_folders(
        &self,
        kind: CategoryKind,
        folders: Vec<String>,
    ) -> Result<Vec<Category>, CatalogError> {
        let mut rows = Vec::with_capacity(folders.len());
        for folder in folders {
            match self.catalog.find_by_name(kind, &folder).await? {
                Some(row) => rows.push(row),
                None => debug!("Folder {:?} has no {} row", folder, kind),
            }
        }
        Ok(rows)
    }

    /// Grades that have PDFs of `pdf_type` or a folder under that type.
    pub async fn grades_for_type(&self, pdf_type: PdfType) -> Result<Vec<Category>, CatalogError> {
        let referenced: BTreeSet<EntityId> = self
            .catalog
            .find_pdf_rows(&PdfFilter::of_type(pdf_type))
            .await?
            .into_iter()
            .map(|pdf| pdf.grade_id)
            .collect();
        let mut grades = self.rows_for_ids(CategoryKind::Grade, referenced).await?;

        let folders = self.folders.list_dirs(&self.folders.type_dir(pdf_type)).await?;
        let discovered = self.rows_for_folders(CategoryKind::Grade, folders).await?;
        merge_by_id(&mut grades, discovered);

        sort_by_name(&mut grades);
        debug!("Listed {} grades for {}", grades.len(), pdf_type);
        Ok(grades)
    }

    /// Subjects under one grade of one type.
    pub async fn subjects_for_grade(
        &self,
        pdf_type: PdfType,
        grade: &Category,
    ) -> Result<Vec<Category>, CatalogError> {
        let referenced: BTreeSet<EntityId> = self
            .catalog
            .find_pdf_rows(&PdfFilter::of_type(pdf_type).grade(&grade.id))
            .await?
            .into_iter()
            .map(|pdf| pdf.subject_id)
            .collect();
        let mut subjects = self.rows_for_ids(CategoryKind::Subject, referenced).await?;

        let folders = self
            .folders
            .list_dirs(&self.folders.grade_dir(pdf_type, &grade.slug))
            .await?;
        let discovered = self.rows_for_folders(CategoryKind::Subject, folders).await?;
        merge_by_id(&mut subjects, discovered);

        sort_by_name(&mut subjects);
        Ok(subjects)
    }

    pub async fn subjects_for_grade_id(
        &self,
        pdf_type: PdfType,
        grade_id: &EntityId,
    ) -> Result<Vec<Category>, CatalogError> {
        let grade = self.catalog.find_by_id(CategoryKind::Grade, grade_id).await?;
        self.subjects_for_grade(pdf_type, &grade).await
    }

    pub async fn subjects_for_grade_name(
        &self,
        pdf_type: PdfType,
        grade_name: &str,
    ) -> Result<Vec<Category>, CatalogError> {
        let grade = self.resolve(CategoryKind::Grade, grade_name).await?;
        self.subjects_for_grade(pdf_type, &grade).await
    }

    /// Mediums under one subject folder.
    ///
    /// Unlike grades and subjects, a medium folder with no catalog row is
    /// still listed, as [`Listed::Discovered`].
    pub async fn mediums_for_subject(
        &self,
        pdf_type: PdfType,
        grade: &Category,
        subject: &Category,
    ) -> Result<Vec<ListedMedium>, CatalogError> {
        let mut slugs: BTreeSet<String> = self
            .catalog
            .find_pdf_rows(&PdfFilter::of_type(pdf_type).grade(&grade.id).subject(&subject.id))
            .await?
            .into_iter()
            .filter_map(|pdf| pdf.medium)
            .collect();
        let subject_dir = self.folders.subject_dir(pdf_type, &grade.slug, &subject.slug);
        slugs.extend(self.folders.list_dirs(&subject_dir).await?);

        let mut seen_ids = HashSet::new();
        let mut mediums = Vec::with_capacity(slugs.len());
        for slug in slugs {
            match self.catalog.find_by_name(CategoryKind::Medium, &slug).await? {
                Some(row) => {
                    if seen_ids.insert(row.id.clone()) {
                        mediums.push(Listed::Persisted(row));
                    }
                }
                None => mediums.push(Listed::Discovered(DiscoveredFolder { slug })),
            }
        }

        sort_listed_mediums(&mut mediums);
        Ok(mediums)
    }

    pub async fn mediums_for_ids(
        &self,
        pdf_type: PdfType,
        grade_id: &EntityId,
        subject_id: &EntityId,
    ) -> Result<Vec<ListedMedium>, CatalogError> {
        let grade = self.catalog.find_by_id(CategoryKind::Grade, grade_id).await?;
        let subject = self.catalog.find_by_id(CategoryKind::Subject, subject_id).await?;
        self.mediums_for_subject(pdf_type, &grade, &subject).await
    }

    /// PDFs under one subject, optionally narrowed to one medium.
    ///
    /// Catalog rows come first; files on disk that no row points at are
    /// added as [`Listed::Discovered`] entries named after their filename.
    /// Without a medium, the subject folder and every medium folder below
    /// it are scanned. A medium that is not a single folder name is
    /// rejected before anything is read.
    pub async fn pdfs_for(
        &self,
        pdf_type: PdfType,
        grade: &Category,
        subject: &Category,
        medium: Option<&str>,
    ) -> Result<Vec<ListedPdf>, CatalogError> {
        let medium = medium
            .map(|m| self.catalog.normalizer().medium(m))
            .filter(|m| !m.is_empty());
        if let Some(ref slug) = medium {
            if !is_folder_segment(slug) {
                warn!("Rejected medium filter {:?}", slug);
                return Err(CatalogError::InvalidInput(format!(
                    "Medium \"{}\" is not a valid folder name",
                    slug
                )));
            }
        }

        let filter = PdfFilter::of_type(pdf_type)
            .grade(&grade.id)
            .subject(&subject.id)
            .medium(medium.as_deref());
        let views = self.catalog.find_pdfs(&filter).await?;

        let known: HashSet<PathBuf> = views.iter().map(|v| v.pdf.file_path.clone()).collect();
        let mut listed: Vec<ListedPdf> = views.into_iter().map(Listed::Persisted).collect();

        for entry in self.scan_pdf_files(pdf_type, grade, subject, medium.as_deref()).await? {
            if known.contains(&entry.full_path) {
                continue;
            }
            if let Some(found) = self.discovered_pdf(entry) {
                listed.push(Listed::Discovered(found));
            }
        }

        sort_listed_pdfs(&mut listed);
        Ok(listed)
    }

    pub async fn pdfs_for_ids(
        &self,
        pdf_type: PdfType,
        grade_id: &EntityId,
        subject_id: &EntityId,
        medium: Option<&str>,
    ) -> Result<Vec<ListedPdf>, CatalogError> {
        let grade = self.catalog.find_by_id(CategoryKind::Grade, grade_id).await?;
        let subject = self.catalog.find_by_id(CategoryKind::Subject, subject_id).await?;
        self.pdfs_for(pdf_type, &grade, &subject, medium).await
    }

    pub async fn pdfs_for_names(
        &self,
        pdf_type: PdfType,
        grade_name: &str,
        subject_name: &str,
        medium: Option<&str>,
    ) -> Result<Vec<ListedPdf>, CatalogError> {
        let grade = self.resolve(CategoryKind::Grade, grade_name).await?;
        let subject = self.resolve(CategoryKind::Subject, subject_name).await?;
        self.pdfs_for(pdf_type, &grade, &subject, medium).await
    }

    async fn resolve(&self, kind: CategoryKind, name: &str) -> Result<Category, CatalogError> {
        self.catalog
            .find_by_name(kind, name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("{} \"{}\" not found", kind.label(), name)))
    }

    async fn scan_pdf_files(
        &self,
        pdf_type: PdfType,
        grade: &Category,
        subject: &Category,
        medium: Option<&str>,
    ) -> Result<Vec<FileEntry>, CatalogError> {
        let subject_dir = self.folders.subject_dir(pdf_type, &grade.slug, &subject.slug);
        if let Some(medium) = medium {
            return Ok(self.folders.list_pdf_files(&subject_dir.join(medium)).await?);
        }

        Ok(self.folders.list_subject_pdf_files(&subject_dir).await?)
    }

    fn discovered_pdf(&self, entry: FileEntry) -> Option<DiscoveredPdf> {
        let Some(path) = self.folders.relative_path(&entry.full_path) else {
            warn!("Scanned file {:?} is outside the storage root", entry.full_path);
            return None;
        };
        Some(DiscoveredPdf {
            name: display_name_from_filename(&entry.filename),
            filename: entry.filename,
            path,
            full_path: entry.full_path,
            size: entry.size,
            modified_at: entry.modified_at,
        })
    }
}
