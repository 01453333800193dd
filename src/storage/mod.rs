//! Filesystem storage.
//!
//! Two trees live on disk:
//! - The PDF tree: `storage_root/{type}/{grade}/{subject}/[{medium}/]{file}.pdf`
//! - The catalog: one JSON Lines file per table under `catalog_dir`

use std::path::PathBuf;
use thiserror::Error;

mod jsonl;

pub use jsonl::*;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Directory is not empty: {0}")]
    NotEmpty(PathBuf),

    #[error("File already exists: {0}")]
    AlreadyExists(PathBuf),
}

/// Locations of the PDF tree and the catalog tables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub storage_root: PathBuf,
    pub catalog_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(storage_root: PathBuf, catalog_dir: PathBuf) -> Self {
        Self {
            storage_root,
            catalog_dir,
        }
    }

    /// Both trees under a single data directory.
    pub fn under(data_dir: PathBuf) -> Self {
        Self::new(data_dir.join("storage"), data_dir.join("catalog"))
    }

    pub fn table_path(&self, table: CatalogTable) -> PathBuf {
        self.catalog_dir.join(table.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./storage"), PathBuf::from("./data/catalog"))
    }
}
