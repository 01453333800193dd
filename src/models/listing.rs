//! Listing results that merge catalog rows with folders found on disk.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::{compare_names, Category, PdfView};

/// An entry that is either backed by a catalog row or only known from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Listed<T, D> {
    /// A catalog row exists for this entry
    Persisted(T),
    /// Found on disk with no catalog row behind it
    Discovered(D),
}

impl<T, D> Listed<T, D> {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Listed::Persisted(_))
    }

    pub fn persisted(&self) -> Option<&T> {
        match self {
            Listed::Persisted(row) => Some(row),
            Listed::Discovered(_) => None,
        }
    }

    pub fn discovered(&self) -> Option<&D> {
        match self {
            Listed::Persisted(_) => None,
            Listed::Discovered(found) => Some(found),
        }
    }
}

/// A folder with no matching catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFolder {
    pub slug: String,
}

/// A medium in a listing.
pub type ListedMedium = Listed<Category, DiscoveredFolder>;

impl ListedMedium {
    /// Name used for ordering; discovered folders sort by slug.
    pub fn sort_name(&self) -> &str {
        match self {
            Listed::Persisted(row) => &row.name,
            Listed::Discovered(found) => &found.slug,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Listed::Persisted(row) => &row.slug,
            Listed::Discovered(found) => &found.slug,
        }
    }
}

/// A PDF file found in a folder with no catalog row pointing at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredPdf {
    /// Filename with the `.pdf` extension and timestamp prefix stripped
    pub name: String,
    pub filename: String,
    /// Path relative to the storage root, usable with the by-path endpoints
    pub path: String,
    #[serde(skip)]
    pub full_path: PathBuf,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// A PDF in a listing.
pub type ListedPdf = Listed<PdfView, DiscoveredPdf>;

impl ListedPdf {
    pub fn sort_name(&self) -> &str {
        match self {
            Listed::Persisted(view) => &view.pdf.name,
            Listed::Discovered(found) => &found.name,
        }
    }
}

/// Sort a listing by display name.
pub fn sort_listed_mediums(items: &mut [ListedMedium]) {
    items.sort_by(|a, b| compare_names(a.sort_name(), b.sort_name()));
}

pub fn sort_listed_pdfs(items: &mut [ListedPdf]) {
    items.sort_by(|a, b| compare_names(a.sort_name(), b.sort_name()));
}

/// A directory with the number of entries directly inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderItem {
    pub name: String,
    pub item_count: usize,
}
