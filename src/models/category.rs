//! Grade, subject and medium rows.
//!
//! The three share one shape: a unique display name, a unique canonical slug
//! that doubles as the folder name on disk, and an optional description.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

/// Which catalog table a [`Category`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Grade,
    Subject,
    Medium,
}

impl CategoryKind {
    /// Human-readable label used in messages ("Grade", "Subject", "Medium").
    pub fn label(&self) -> &'static str {
        match self {
            CategoryKind::Grade => "Grade",
            CategoryKind::Subject => "Subject",
            CategoryKind::Medium => "Medium",
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryKind::Grade => write!(f, "grade"),
            CategoryKind::Subject => write!(f, "subject"),
            CategoryKind::Medium => write!(f, "medium"),
        }
    }
}

/// A grade, subject or medium row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,

    /// Display name, e.g. "Grade 01" or "Information Technology"
    pub name: String,

    /// Canonical folder name, e.g. "grade-01" or "information-technology"
    pub slug: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Create a new row with a random id.
    pub fn new(name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::random(),
            name,
            slug,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Display-name ordering used by every listing.
///
/// Compares case-insensitively first so "advance Level" sorts next to
/// "Advance Level", then falls back to the raw strings for a stable order.
pub fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Sort categories by display name.
pub fn sort_by_name(categories: &mut [Category]) {
    categories.sort_by(|a, b| compare_names(&a.name, &b.name));
}
