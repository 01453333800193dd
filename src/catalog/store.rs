//! Entity rules over a catalog backend.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CatalogBackend, CatalogError, CategoryCriteria};
use crate::folders::{is_folder_segment, FolderTree};
use crate::models::{
    compare_names, sort_by_name, Category, CategoryKind, EntityId, Pdf, PdfFilter, PdfUpdate, PdfView,
};
use crate::normalize::Normalizer;

/// Grade, subject, medium and PDF operations with normalization,
/// find-or-create and delete guards.
#[derive(Clone)]
pub struct CatalogStore {
    backend: Arc<dyn CatalogBackend>,
    normalizer: Normalizer,
    folders: FolderTree,
}

impl CatalogStore {
    pub fn new(backend: Arc<dyn CatalogBackend>, normalizer: Normalizer, folders: FolderTree) -> Self {
        Self {
            backend,
            normalizer,
            folders,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn slug(&self, kind: CategoryKind, name: &str) -> String {
        self.normalizer.slug(kind, name)
    }

    /// Insert a new row. Fails with `Conflict` when the name or its slug is taken.
    pub async fn create(
        &self,
        kind: CategoryKind,
        name: &str,
        description: Option<String>,
    ) -> Result<Category, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidInput(format!(
                "{} name must not be empty",
                kind.label()
            )));
        }
        let slug = self.slug(kind, name);
        if !is_folder_segment(&slug) {
            return Err(CatalogError::InvalidInput(format!(
                "{} name \"{}\" does not produce a usable folder name",
                kind.label(),
                name
            )));
        }

        let row = Category::new(name.to_string(), slug).with_description(description);
        let row = self.backend.insert_category(kind, row).await?;
        info!("Created {} {:?} ({}) as {}", kind, row.name, row.slug, row.id);
        Ok(row)
    }

    pub async fn find_by_id(&self, kind: CategoryKind, id: &EntityId) -> Result<Category, CatalogError> {
        self.backend
            .find_category(kind, &CategoryCriteria::Id(id.clone()))
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("{} with ID {} not found", kind.label(), id)))
    }

    /// Look up a row by exact display name or by the slug `name` normalizes to.
    pub async fn find_by_name(
        &self,
        kind: CategoryKind,
        name: &str,
    ) -> Result<Option<Category>, CatalogError> {
        let name = name.trim();
        let criteria = CategoryCriteria::NameOrSlug {
            name: name.to_string(),
            slug: self.slug(kind, name),
        };
        self.backend.find_category(kind, &criteria).await
    }

    /// Existing row for `name`, or a newly created one.
    ///
    /// A concurrent creator can win between the lookup and the insert; the
    /// resulting `Conflict` is answered with a second lookup.
    pub async fn find_or_create(&self, kind: CategoryKind, name: &str) -> Result<Category, CatalogError> {
        if let Some(row) = self.find_by_name(kind, name).await? {
            return Ok(row);
        }
        match self.create(kind, name, None).await {
            Ok(row) => Ok(row),
            Err(CatalogError::Conflict(msg)) => {
                debug!("Create {} {:?} lost a race ({}), retrying lookup", kind, name, msg);
                self.find_by_name(kind, name)
                    .await?
                    .ok_or(CatalogError::Conflict(msg))
            }
            Err(e) => Err(e),
        }
    }

    /// All rows of a kind, ordered by display name.
    pub async fn list(&self, kind: CategoryKind) -> Result<Vec<Category>, CatalogError> {
        let mut rows = self.backend.list_categories(kind).await?;
        sort_by_name(&mut rows);
        Ok(rows)
    }

    /// Delete a row if nothing depends on it.
    ///
    /// Grades and subjects are blocked by PDF rows referencing them. Mediums
    /// are not foreign keys, so they are blocked by PDF rows tagged with the
    /// medium slug or by a populated medium folder anywhere in the tree.
    pub async fn delete(&self, kind: CategoryKind, id: &EntityId) -> Result<Category, CatalogError> {
        let row = self.find_by_id(kind, id).await?;

        let dependents = match kind {
            CategoryKind::Grade => {
                self.backend
                    .count_pdfs(&PdfFilter::default().grade(&row.id))
                    .await?
            }
            CategoryKind::Subject => {
                self.backend
                    .count_pdfs(&PdfFilter::default().subject(&row.id))
                    .await?
            }
            CategoryKind::Medium => {
                let tagged = self
                    .backend
                    .count_pdfs(&PdfFilter::default().medium(Some(&row.slug)))
                    .await?;
                if tagged == 0 && self.folders.medium_in_use(&row.slug).await? {
                    return Err(CatalogError::Conflict(format!(
                        "Cannot delete medium: folders named \"{}\" still contain files",
                        row.slug
                    )));
                }
                tagged
            }
        };

        if dependents > 0 {
            return Err(CatalogError::Conflict(format!(
                "Cannot delete {}: it has {} PDF(s). Delete PDFs first.",
                kind, dependents
            )));
        }

        if !self.backend.remove_category(kind, &row.id).await? {
            return Err(CatalogError::NotFound(format!(
                "{} with ID {} not found",
                kind.label(),
                id
            )));
        }
        info!("Deleted {} {:?} ({})", kind, row.name, row.id);
        Ok(row)
    }

    /// Idempotently insert rows for `names` with ids derived from their slugs.
    ///
    /// Existing rows (matched by name or slug) are returned untouched.
    pub async fn seed(&self, kind: CategoryKind, names: &[String]) -> Result<Vec<Category>, CatalogError> {
        let mut rows = Vec::with_capacity(names.len());
        for name in names {
            if let Some(existing) = self.find_by_name(kind, name).await? {
                rows.push(existing);
                continue;
            }

            let name = name.trim();
            let slug = self.slug(kind, name);
            if name.is_empty() || !is_folder_segment(&slug) {
                warn!("Skipping unusable seed {} {:?}", kind, name);
                continue;
            }

            let id = EntityId::generate(&[&kind.to_string(), &slug]);
            let row = Category::new(name.to_string(), slug).with_id(id);
            match self.backend.insert_category(kind, row).await {
                Ok(row) => {
                    info!("Seeded {} {:?}", kind, row.name);
                    rows.push(row);
                }
                Err(CatalogError::Conflict(_)) => {
                    if let Some(existing) = self.find_by_name(kind, name).await? {
                        rows.push(existing);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(rows)
    }

    pub async fn create_pdf(&self, pdf: Pdf) -> Result<Pdf, CatalogError> {
        let pdf = self.backend.insert_pdf(pdf).await?;
        info!("Recorded PDF {:?} ({}) at {:?}", pdf.name, pdf.id, pdf.file_path);
        Ok(pdf)
    }

    pub async fn find_pdf(&self, id: &EntityId) -> Result<Pdf, CatalogError> {
        self.backend
            .find_pdf(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("PDF with ID {} not found", id)))
    }

    /// Raw rows matching `filter`, unordered.
    pub async fn find_pdf_rows(&self, filter: &PdfFilter) -> Result<Vec<Pdf>, CatalogError> {
        self.backend.find_pdfs(filter).await
    }

    /// Rows matching `filter` joined with their grade and subject, by name.
    ///
    /// Rows whose grade or subject no longer exists are skipped.
    pub async fn find_pdfs(&self, filter: &PdfFilter) -> Result<Vec<PdfView>, CatalogError> {
        let rows = self.backend.find_pdfs(filter).await?;
        let mut views = self.join(rows).await?;
        views.sort_by(|a, b| compare_names(&a.pdf.name, &b.pdf.name));
        Ok(views)
    }

    /// Join one row with its grade and subject.
    pub async fn view(&self, pdf: Pdf) -> Result<PdfView, CatalogError> {
        let grade = self.find_by_id(CategoryKind::Grade, &pdf.grade_id).await?;
        let subject = self.find_by_id(CategoryKind::Subject, &pdf.subject_id).await?;
        Ok(PdfView {
            pdf,
            grade,
            subject,
        })
    }

    async fn join(&self, rows: Vec<Pdf>) -> Result<Vec<PdfView>, CatalogError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let grades = self.backend.list_categories(CategoryKind::Grade).await?;
        let subjects = self.backend.list_categories(CategoryKind::Subject).await?;

        let views = rows
            .into_iter()
            .filter_map(|pdf| {
                let Some(grade) = grades.iter().find(|g| g.id == pdf.grade_id) else {
                    warn!("PDF {} references missing grade {}", pdf.id, pdf.grade_id);
                    return None;
                };
                let Some(subject) = subjects.iter().find(|s| s.id == pdf.subject_id) else {
                    warn!("PDF {} references missing subject {}", pdf.id, pdf.subject_id);
                    return None;
                };
                Some(PdfView {
                    grade: grade.clone(),
                    subject: subject.clone(),
                    pdf,
                })
            })
            .collect();
        Ok(views)
    }

    /// Remove the row only. The backing file is the caller's concern.
    pub async fn delete_pdf(&self, id: &EntityId) -> Result<Pdf, CatalogError> {
        let pdf = self.find_pdf(id).await?;
        if !self.backend.remove_pdf(id).await? {
            return Err(CatalogError::NotFound(format!("PDF with ID {} not found", id)));
        }
        info!("Deleted PDF row {:?} ({})", pdf.name, pdf.id);
        Ok(pdf)
    }

    pub async fn update_pdf(&self, id: &EntityId, update: &PdfUpdate) -> Result<Pdf, CatalogError> {
        let mut pdf = self.find_pdf(id).await?;
        if update.is_empty() {
            return Ok(pdf);
        }
        update.apply(&mut pdf);
        let pdf = self.backend.update_pdf(pdf).await?;
        info!("Updated PDF {}", pdf.id);
        Ok(pdf)
    }
}
