//! In-process catalog tables.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CatalogBackend, CatalogError, CategoryCriteria};
use crate::models::{Category, CategoryKind, EntityId, Pdf, PdfFilter};

/// The four catalog tables with their constraints.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub grades: Vec<Category>,
    pub subjects: Vec<Category>,
    pub mediums: Vec<Category>,
    pub pdfs: Vec<Pdf>,
}

impl Tables {
    pub fn categories(&self, kind: CategoryKind) -> &Vec<Category> {
        match kind {
            CategoryKind::Grade => &self.grades,
            CategoryKind::Subject => &self.subjects,
            CategoryKind::Medium => &self.mediums,
        }
    }

    fn categories_mut(&mut self, kind: CategoryKind) -> &mut Vec<Category> {
        match kind {
            CategoryKind::Grade => &mut self.grades,
            CategoryKind::Subject => &mut self.subjects,
            CategoryKind::Medium => &mut self.mediums,
        }
    }

    pub fn find_category(&self, kind: CategoryKind, criteria: &CategoryCriteria) -> Option<Category> {
        self.categories(kind)
            .iter()
            .find(|row| criteria.matches(row))
            .cloned()
    }

    pub fn insert_category(&mut self, kind: CategoryKind, row: Category) -> Result<Category, CatalogError> {
        let rows = self.categories_mut(kind);
        if rows.iter().any(|r| r.id == row.id) {
            return Err(CatalogError::Conflict(format!(
                "{} with ID {} already exists",
                kind.label(),
                row.id
            )));
        }
        if let Some(existing) = rows.iter().find(|r| r.name == row.name || r.slug == row.slug) {
            return Err(CatalogError::Conflict(format!(
                "{} \"{}\" already exists (as \"{}\")",
                kind.label(),
                row.name,
                existing.name
            )));
        }
        rows.push(row.clone());
        Ok(row)
    }

    /// Remove a row. Grades and subjects still referenced by a PDF row are
    /// refused, whatever the caller checked beforehand.
    pub fn remove_category(&mut self, kind: CategoryKind, id: &EntityId) -> Result<bool, CatalogError> {
        let referencing = match kind {
            CategoryKind::Grade => self.pdfs.iter().filter(|p| &p.grade_id == id).count(),
            CategoryKind::Subject => self.pdfs.iter().filter(|p| &p.subject_id == id).count(),
            CategoryKind::Medium => 0,
        };
        if referencing > 0 {
            return Err(CatalogError::Conflict(format!(
                "Cannot delete {}: it has {} PDF(s). Delete PDFs first.",
                kind, referencing
            )));
        }

        let rows = self.categories_mut(kind);
        let before = rows.len();
        rows.retain(|r| &r.id != id);
        Ok(rows.len() != before)
    }

    pub fn find_pdfs(&self, filter: &PdfFilter) -> Vec<Pdf> {
        self.pdfs.iter().filter(|p| filter.matches(p)).cloned().collect()
    }

    pub fn insert_pdf(&mut self, pdf: Pdf) -> Result<Pdf, CatalogError> {
        if !self.grades.iter().any(|g| g.id == pdf.grade_id) {
            return Err(CatalogError::NotFound(format!(
                "Grade with ID {} not found",
                pdf.grade_id
            )));
        }
        if !self.subjects.iter().any(|s| s.id == pdf.subject_id) {
            return Err(CatalogError::NotFound(format!(
                "Subject with ID {} not found",
                pdf.subject_id
            )));
        }
        if self.pdfs.iter().any(|p| p.id == pdf.id) {
            return Err(CatalogError::Conflict(format!(
                "PDF with ID {} already exists",
                pdf.id
            )));
        }
        self.pdfs.push(pdf.clone());
        Ok(pdf)
    }

    pub fn update_pdf(&mut self, pdf: Pdf) -> Result<Pdf, CatalogError> {
        let slot = self
            .pdfs
            .iter_mut()
            .find(|p| p.id == pdf.id)
            .ok_or_else(|| CatalogError::NotFound(format!("PDF with ID {} not found", pdf.id)))?;
        *slot = pdf.clone();
        Ok(pdf)
    }

    pub fn remove_pdf(&mut self, id: &EntityId) -> bool {
        let before = self.pdfs.len();
        self.pdfs.retain(|p| &p.id != id);
        self.pdfs.len() != before
    }
}

/// Catalog held in memory only. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogBackend for MemoryCatalog {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_category(
        &self,
        kind: CategoryKind,
        criteria: &CategoryCriteria,
    ) -> Result<Option<Category>, CatalogError> {
        Ok(self.tables.read().await.find_category(kind, criteria))
    }

    async fn list_categories(&self, kind: CategoryKind) -> Result<Vec<Category>, CatalogError> {
        Ok(self.tables.read().await.categories(kind).clone())
    }

    async fn insert_category(
        &self,
        kind: CategoryKind,
        row: Category,
    ) -> Result<Category, CatalogError> {
        self.tables.write().await.insert_category(kind, row)
    }

    async fn remove_category(
        &self,
        kind: CategoryKind,
        id: &EntityId,
    ) -> Result<bool, CatalogError> {
        self.tables.write().await.remove_category(kind, id)
    }

    async fn find_pdf(&self, id: &EntityId) -> Result<Option<Pdf>, CatalogError> {
        Ok(self
            .tables
            .read()
            .await
            .pdfs
            .iter()
            .find(|p| &p.id == id)
            .cloned())
    }

    async fn find_pdfs(&self, filter: &PdfFilter) -> Result<Vec<Pdf>, CatalogError> {
        Ok(self.tables.read().await.find_pdfs(filter))
    }

    async fn count_pdfs(&self, filter: &PdfFilter) -> Result<usize, CatalogError> {
        Ok(self
            .tables
            .read()
            .await
            .pdfs
            .iter()
            .filter(|p| filter.matches(p))
            .count())
    }

    async fn insert_pdf(&self, pdf: Pdf) -> Result<Pdf, CatalogError> {
        self.tables.write().await.insert_pdf(pdf)
    }

    async fn update_pdf(&self, pdf: Pdf) -> Result<Pdf, CatalogError> {
        self.tables.write().await.update_pdf(pdf)
    }

    async fn remove_pdf(&self, id: &EntityId) -> Result<bool, CatalogError> {
        Ok(self.tables.write().await.remove_pdf(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PdfType;
    use std::path::PathBuf;

    fn category(name: &str, slug: &str) -> Category {
        Category::new(name.to_string(), slug.to_string())
    }

    fn pdf(grade: &Category, subject: &Category, pdf_type: PdfType) -> Pdf {
        Pdf::new(
            "Doc".to_string(),
            "1-doc.pdf".to_string(),
            PathBuf::from("storage/x/1-doc.pdf"),
            pdf_type,
            10,
            grade.id.clone(),
            subject.id.clone(),
        )
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_name_and_slug() {
        let catalog = MemoryCatalog::new();
        catalog
            .insert_category(CategoryKind::Grade, category("Grade 01", "grade-01"))
            .await
            .unwrap();

        let same_slug = catalog
            .insert_category(CategoryKind::Grade, category("Grade 1", "grade-01"))
            .await;
        assert!(matches!(same_slug, Err(CatalogError::Conflict(_))));

        let same_name = catalog
            .insert_category(CategoryKind::Grade, category("Grade 01", "other"))
            .await;
        assert!(matches!(same_name, Err(CatalogError::Conflict(_))));

        // Uniqueness is per kind
        catalog
            .insert_category(CategoryKind::Subject, category("Grade 01", "grade-01"))
            .await
            .unwrap();
        assert_eq!(
            catalog.list_categories(CategoryKind::Grade).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_find_and_remove_category() {
        let catalog = MemoryCatalog::new();
        let row = catalog
            .insert_category(CategoryKind::Medium, category("English", "english"))
            .await
            .unwrap();

        let found = catalog
            .find_category(
                CategoryKind::Medium,
                &CategoryCriteria::NameOrSlug {
                    name: "en".to_string(),
                    slug: "english".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(found, Some(row.clone()));

        assert!(catalog
            .remove_category(CategoryKind::Medium, &row.id)
            .await
            .unwrap());
        assert!(!catalog
            .remove_category(CategoryKind::Medium, &row.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_pdf_foreign_keys() {
        let catalog = MemoryCatalog::new();
        let grade = category("Grade 01", "grade-01");
        let subject = category("Science", "science");

        let err = catalog
            .insert_pdf(pdf(&grade, &subject, PdfType::Syllabus))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        catalog
            .insert_category(CategoryKind::Grade, grade.clone())
            .await
            .unwrap();
        catalog
            .insert_category(CategoryKind::Subject, subject.clone())
            .await
            .unwrap();
        catalog
            .insert_pdf(pdf(&grade, &subject, PdfType::Syllabus))
            .await
            .unwrap();
        catalog
            .insert_pdf(pdf(&grade, &subject, PdfType::PastPapers))
            .await
            .unwrap();

        let filter = PdfFilter::of_type(PdfType::Syllabus).grade(&grade.id);
        assert_eq!(catalog.count_pdfs(&filter).await.unwrap(), 1);
        assert_eq!(
            catalog
                .count_pdfs(&PdfFilter::default().subject(&subject.id))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_remove_category_refuses_referenced_rows() {
        let catalog = MemoryCatalog::new();
        let grade = catalog
            .insert_category(CategoryKind::Grade, category("Grade 03", "grade-03"))
            .await
            .unwrap();
        let subject = catalog
            .insert_category(CategoryKind::Subject, category("History", "history"))
            .await
            .unwrap();
        let row = catalog
            .insert_pdf(pdf(&grade, &subject, PdfType::Syllabus))
            .await
            .unwrap();

        for (kind, id) in [(CategoryKind::Grade, &grade.id), (CategoryKind::Subject, &subject.id)] {
            let err = catalog.remove_category(kind, id).await.unwrap_err();
            assert!(matches!(err, CatalogError::Conflict(_)), "{kind}: {err}");
        }
        assert_eq!(catalog.list_categories(CategoryKind::Grade).await.unwrap().len(), 1);
        assert_eq!(catalog.find_pdfs(&PdfFilter::default()).await.unwrap().len(), 1);

        assert!(catalog.remove_pdf(&row.id).await.unwrap());
        assert!(catalog
            .remove_category(CategoryKind::Grade, &grade.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_and_remove_pdf() {
        let catalog = MemoryCatalog::new();
        let grade = catalog
            .insert_category(CategoryKind::Grade, category("Grade 02", "grade-02"))
            .await
            .unwrap();
        let subject = catalog
            .insert_category(CategoryKind::Subject, category("Art", "art"))
            .await
            .unwrap();
        let mut row = catalog
            .insert_pdf(pdf(&grade, &subject, PdfType::Syllabus))
            .await
            .unwrap();

        row.name = "Renamed".to_string();
        catalog.update_pdf(row.clone()).await.unwrap();
        assert_eq!(
            catalog.find_pdf(&row.id).await.unwrap().unwrap().name,
            "Renamed"
        );

        assert!(catalog.remove_pdf(&row.id).await.unwrap());
        assert!(catalog.find_pdf(&row.id).await.unwrap().is_none());
        assert!(matches!(
            catalog.update_pdf(row).await,
            Err(CatalogError::NotFound(_))
        ));
    }
}
