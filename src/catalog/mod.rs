//! Catalog storage.
//!
//! The catalog is the relational side of the system: grade, subject and
//! medium rows with unique names and slugs, and PDF rows referencing a grade
//! and a subject. [`CatalogBackend`] is the table-level seam (find, list,
//! count, insert, remove); [`CatalogStore`] layers the entity rules on top
//! (normalization, find-or-create, delete guards).

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Category, CategoryKind, EntityId, Pdf, PdfFilter};
use crate::storage::StorageError;

mod jsonl;
mod memory;
mod store;

pub use jsonl::JsonlCatalog;
pub use memory::MemoryCatalog;
pub use store::CatalogStore;

/// Errors raised by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Catalog storage error: {0}")]
    Storage(#[from] StorageError),
}

/// How to look up a grade, subject or medium row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryCriteria {
    Id(EntityId),
    /// Matches a row whose display name equals `name` or whose slug equals `slug`
    NameOrSlug { name: String, slug: String },
}

impl CategoryCriteria {
    pub fn matches(&self, row: &Category) -> bool {
        match self {
            CategoryCriteria::Id(id) => &row.id == id,
            CategoryCriteria::NameOrSlug { name, slug } => &row.name == name || &row.slug == slug,
        }
    }
}

/// Table-level catalog operations.
///
/// Implementations enforce the table constraints: unique display names and
/// slugs per category kind, and PDF foreign keys to existing grade and
/// subject rows (on insert and on category removal). They do not normalize
/// or check folders.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn find_category(
        &self,
        kind: CategoryKind,
        criteria: &CategoryCriteria,
    ) -> Result<Option<Category>, CatalogError>;

    async fn list_categories(&self, kind: CategoryKind) -> Result<Vec<Category>, CatalogError>;

    /// Insert a row. Fails with `Conflict` if the name or slug is taken.
    async fn insert_category(
        &self,
        kind: CategoryKind,
        row: Category,
    ) -> Result<Category, CatalogError>;

    /// Remove a row. Returns false if no row had that id. Fails with
    /// `Conflict` if a PDF row still references a grade or subject.
    async fn remove_category(&self, kind: CategoryKind, id: &EntityId)
        -> Result<bool, CatalogError>;

    async fn find_pdf(&self, id: &EntityId) -> Result<Option<Pdf>, CatalogError>;

    async fn find_pdfs(&self, filter: &PdfFilter) -> Result<Vec<Pdf>, CatalogError>;

    async fn count_pdfs(&self, filter: &PdfFilter) -> Result<usize, CatalogError>;

    /// Insert a PDF row. Fails with `NotFound` if its grade or subject is unknown.
    async fn insert_pdf(&self, pdf: Pdf) -> Result<Pdf, CatalogError>;

    /// Replace an existing PDF row. Fails with `NotFound` if absent.
    async fn update_pdf(&self, pdf: Pdf) -> Result<Pdf, CatalogError>;

    async fn remove_pdf(&self, id: &EntityId) -> Result<bool, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_matching() {
        let row = Category::new("Grade 01".to_string(), "grade-01".to_string())
            .with_id(EntityId::from("g1"));

        assert!(CategoryCriteria::Id(EntityId::from("g1")).matches(&row));
        assert!(!CategoryCriteria::Id(EntityId::from("g2")).matches(&row));
        assert!(CategoryCriteria::NameOrSlug {
            name: "Grade 01".to_string(),
            slug: "nope".to_string()
        }
        .matches(&row));
        assert!(CategoryCriteria::NameOrSlug {
            name: "grade 1".to_string(),
            slug: "grade-01".to_string()
        }
        .matches(&row));
        assert!(!CategoryCriteria::NameOrSlug {
            name: "Grade 02".to_string(),
            slug: "grade-02".to_string()
        }
        .matches(&row));
    }
}
