//! Catalog persisted as JSON Lines tables.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::memory::Tables;
use super::{CatalogBackend, CatalogError, CategoryCriteria};
use crate::models::{Category, CategoryKind, EntityId, Pdf, PdfFilter};
use crate::storage::{CatalogTable, JsonlReader, JsonlWriter, StorageConfig};

/// Catalog backed by `grades.jsonl`, `subjects.jsonl`, `mediums.jsonl` and
/// `pdfs.jsonl` in one directory.
///
/// Tables are loaded once at open. Every mutation is applied to a copy,
/// the affected table file is rewritten, and only then does the copy become
/// visible, so a failed write leaves both memory and disk unchanged.
pub struct JsonlCatalog {
    storage: StorageConfig,
    tables: RwLock<Tables>,
}

impl JsonlCatalog {
    /// Load all tables from `storage.catalog_dir`. Missing files are empty tables.
    pub fn open(storage: StorageConfig) -> Result<Self, CatalogError> {
        let read = |table: CatalogTable| -> Result<Vec<Category>, CatalogError> {
            Ok(JsonlReader::new(storage.table_path(table)).read_all()?)
        };

        let tables = Tables {
            grades: read(CatalogTable::Grades)?,
            subjects: read(CatalogTable::Subjects)?,
            mediums: read(CatalogTable::Mediums)?,
            pdfs: JsonlReader::new(storage.table_path(CatalogTable::Pdfs)).read_all()?,
        };

        info!(
            "Opened catalog at {:?}: {} grades, {} subjects, {} mediums, {} PDFs",
            storage.catalog_dir,
            tables.grades.len(),
            tables.subjects.len(),
            tables.mediums.len(),
            tables.pdfs.len()
        );

        Ok(Self {
            storage,
            tables: RwLock::new(tables),
        })
    }

    pub fn catalog_dir(&self) -> &PathBuf {
        &self.storage.catalog_dir
    }

    fn persist(&self, tables: &Tables, table: CatalogTable) -> Result<(), CatalogError> {
        let path = self.storage.table_path(table);
        match table {
            CatalogTable::Pdfs => {
                JsonlWriter::new(path).write_all(&tables.pdfs)?;
            }
            CatalogTable::Grades => {
                JsonlWriter::new(path).write_all(&tables.grades)?;
            }
            CatalogTable::Subjects => {
                JsonlWriter::new(path).write_all(&tables.subjects)?;
            }
            CatalogTable::Mediums => {
                JsonlWriter::new(path).write_all(&tables.mediums)?;
            }
        }
        Ok(())
    }

    /// Apply `change` to a copy of the tables, persist `table`, then commit.
    async fn mutate<T, F>(&self, table: CatalogTable, change: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut Tables) -> Result<T, CatalogError>,
    {
        let mut guard = self.tables.write().await;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        self.persist(&next, table)?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl CatalogBackend for JsonlCatalog {
    fn name(&self) -> &'static str {
        "jsonl"
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
        self.mutate(CatalogTable::for_kind(kind), |t| t.insert_category(kind, row))
            .await
    }

    async fn remove_category(
        &self,
        kind: CategoryKind,
        id: &EntityId,
    ) -> Result<bool, CatalogError> {
        self.mutate(CatalogTable::for_kind(kind), |t| t.remove_category(kind, id))
            .await
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
        self.mutate(CatalogTable::Pdfs, |t| t.insert_pdf(pdf)).await
    }

    async fn update_pdf(&self, pdf: Pdf) -> Result<Pdf, CatalogError> {
        self.mutate(CatalogTable::Pdfs, |t| t.update_pdf(pdf)).await
    }

    async fn remove_pdf(&self, id: &EntityId) -> Result<bool, CatalogError> {
        self.mutate(CatalogTable::Pdfs, |t| Ok(t.remove_pdf(id))).await
    }
}
