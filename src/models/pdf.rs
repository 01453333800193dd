//! PDF document rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use super::{Category, EntityId, GradeId, PdfId, SubjectId};

/// The only MIME type accepted for uploads.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Top-level document category, also the first directory level on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdfType {
    #[serde(rename = "syllabus", alias = "sylabus")]
    Syllabus,
    #[serde(rename = "past-papers", alias = "pastpapers")]
    PastPapers,
}

impl PdfType {
    pub const ALL: [PdfType; 2] = [PdfType::Syllabus, PdfType::PastPapers];

    /// Directory name under the storage root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            PdfType::Syllabus => "syllabus",
            PdfType::PastPapers => "past-papers",
        }
    }
}

impl std::fmt::Display for PdfType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Error returned when a type string is not one of the known spellings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown PDF type \"{0}\" (expected syllabus or past-papers)")]
pub struct UnknownPdfType(pub String);

impl FromStr for PdfType {
    type Err = UnknownPdfType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "syllabus" | "sylabus" => Ok(PdfType::Syllabus),
            "past-papers" | "pastpapers" | "past_papers" | "pastpaper" | "past-paper" => {
                Ok(PdfType::PastPapers)
            }
            _ => Err(UnknownPdfType(s.to_string())),
        }
    }
}

/// A stored PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pdf {
    pub id: PdfId,

    /// Display name chosen by the uploader
    pub name: String,

    /// Filename on disk (timestamp prefix + sanitized original name)
    pub filename: String,

    /// Full path of the stored file
    pub file_path: PathBuf,

    #[serde(rename = "type")]
    pub pdf_type: PdfType,

    pub file_size: u64,

    pub mime_type: String,

    pub grade_id: GradeId,

    pub subject_id: SubjectId,

    /// Medium folder the file was written to, if any. Not a foreign key.
    #[serde(default)]
    pub medium: Option<String>,

    pub description: Option<String>,

    pub year: Option<i32>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Pdf {
    pub fn new(
        name: String,
        filename: String,
        file_path: PathBuf,
        pdf_type: PdfType,
        file_size: u64,
        grade_id: GradeId,
        subject_id: SubjectId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::random(),
            name,
            filename,
            file_path,
            pdf_type,
            file_size,
            mime_type: PDF_MIME_TYPE.to_string(),
            grade_id,
            subject_id,
            medium: None,
            description: None,
            year: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_medium(mut self, medium: Option<String>) -> Self {
        self.medium = medium;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }
}

/// Row filter for PDF queries. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfFilter {
    pub pdf_type: Option<PdfType>,
    pub grade_id: Option<GradeId>,
    pub subject_id: Option<SubjectId>,
    pub medium: Option<String>,
}

impl PdfFilter {
    pub fn of_type(pdf_type: PdfType) -> Self {
        Self {
            pdf_type: Some(pdf_type),
            ..Self::default()
        }
    }

    pub fn grade(mut self, id: &GradeId) -> Self {
        self.grade_id = Some(id.clone());
        self
    }

    pub fn subject(mut self, id: &SubjectId) -> Self {
        self.subject_id = Some(id.clone());
        self
    }

    pub fn medium(mut self, slug: Option<&str>) -> Self {
        self.medium = slug.map(str::to_string);
        self
    }

    pub fn matches(&self, pdf: &Pdf) -> bool {
        self.pdf_type.map_or(true, |t| pdf.pdf_type == t)
            && self.grade_id.as_ref().map_or(true, |g| &pdf.grade_id == g)
            && self.subject_id.as_ref().map_or(true, |s| &pdf.subject_id == s)
            && self
                .medium
                .as_deref()
                .map_or(true, |m| pdf.medium.as_deref() == Some(m))
    }
}

/// Partial update of the user-editable PDF fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PdfUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
}

impl PdfUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.year.is_none()
    }

    pub fn apply(&self, pdf: &mut Pdf) {
        if let Some(ref name) = self.name {
            pdf.name = name.clone();
        }
        if let Some(ref description) = self.description {
            pdf.description = Some(description.clone());
        }
        if let Some(year) = self.year {
            pdf.year = Some(year);
        }
        pdf.updated_at = Utc::now();
    }
}

/// A PDF row joined with its grade and subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfView {
    #[serde(flatten)]
    pub pdf: Pdf,
    pub grade: Category,
    pub subject: Category,
}
