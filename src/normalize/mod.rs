//! Name normalization.
//!
//! Maps free-text grade, subject and medium names onto the canonical slugs
//! used both as catalog keys and as folder names, and sanitizes uploaded
//! filenames before they touch the filesystem.
//!
//! Every function here is total: unrecognized input degrades to a cleaned
//! slug instead of failing. Callers that need a non-empty result check for
//! it themselves.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::CategoryKind;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());
static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());
static TIMESTAMP_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-").unwrap());

const GRADE_ALIASES: &[(&str, &str)] = &[
    ("grade-01", "grade-01"),
    ("grade-1", "grade-01"),
    ("grade-02", "grade-02"),
    ("grade-2", "grade-02"),
    ("grade-03", "grade-03"),
    ("grade-3", "grade-03"),
    ("grade-04", "grade-04"),
    ("grade-4", "grade-04"),
    ("grade-05", "grade-05"),
    ("grade-5", "grade-05"),
    ("grade-06", "grade-06"),
    ("grade-6", "grade-06"),
    ("grade-07", "grade-07"),
    ("grade-7", "grade-07"),
    ("grade-08", "grade-08"),
    ("grade-8", "grade-08"),
    ("grade-09", "grade-09"),
    ("grade-9", "grade-09"),
    ("grade-10", "grade-10"),
    ("grade-11", "grade-11"),
    ("grade-11-ol", "grade-11-ol"),
    ("grade-11-o-l", "grade-11-ol"),
    ("grade-12", "grade-12"),
    ("grade-12-al", "grade-12-al"),
    ("grade-12-a-l", "grade-12-al"),
    ("grade-13", "grade-13"),
    ("grade-13-al", "grade-13-al"),
    ("grade-13-a-l", "grade-13-al"),
    ("advance-level", "advance-level"),
    ("advanced-level", "advance-level"),
    ("a-level", "advance-level"),
    ("al", "advance-level"),
    ("ordinary-level", "ordinary-level"),
    ("o-level", "ordinary-level"),
    ("ol", "ordinary-level"),
];

const SUBJECT_ALIASES: &[(&str, &str)] = &[
    ("mathematics", "mathematics"),
    ("maths", "mathematics"),
    ("math", "mathematics"),
    ("science", "science"),
    ("english", "english"),
    ("english-language", "english"),
    ("english-language-arts", "english"),
    ("sinhala", "sinhala"),
    ("tamil", "tamil"),
    ("history", "history"),
    ("geography", "geography"),
    ("civics", "civics"),
    ("citizenship-education", "civics"),
    ("information-technology", "information-technology"),
    ("it", "information-technology"),
    ("ict", "information-technology"),
    ("computer-science", "information-technology"),
    ("art", "art"),
    ("arts", "art"),
    ("art-and-design", "art"),
    ("music", "music"),
    ("physical-education", "physical-education"),
    ("pe", "physical-education"),
    ("health", "health"),
    ("health-and-physical-education", "physical-education"),
    ("religion", "religion"),
    ("buddhism", "religion"),
    ("christianity", "religion"),
    ("islam", "religion"),
    ("hinduism", "religion"),
    ("commerce", "commerce"),
    ("accounting", "commerce"),
    ("business-studies", "commerce"),
    ("agriculture", "agriculture"),
    ("agri", "agriculture"),
    ("drama", "drama"),
    ("theatre", "drama"),
    ("dance", "dance"),
    ("western-music", "western-music"),
    ("eastern-music", "eastern-music"),
];

const MEDIUM_ALIASES: &[(&str, &str)] = &[
    ("sinhala", "sinhala"),
    ("sinhalese", "sinhala"),
    ("si", "sinhala"),
    ("english", "english"),
    ("eng", "english"),
    ("en", "english"),
    ("tamil", "tamil"),
    ("ta", "tamil"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(alias, _)| *alias == key).map(|(_, slug)| *slug)
}

/// Lowercase, collapse whitespace to hyphens.
fn hyphenate(input: &str) -> String {
    WHITESPACE
        .replace_all(input.trim().to_lowercase().as_str(), "-")
        .into_owned()
}

/// Canonical slug for a grade name.
///
/// Plain integers 1..=13 stay numeric ("7" -> "7"). Anything else is cleaned
/// into a slug and run through the alias table ("Grade 1" -> "grade-01",
/// "A/L" -> "advance-level"); unknown grades keep their cleaned form.
pub fn normalize_grade(input: &str) -> String {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        if (1..=13).contains(&n) {
            return n.to_string();
        }
    }

    let cleaned = hyphenate(trimmed).replace(['(', ')'], "").replace(['/', '\\'], "-");
    let cleaned = NON_SLUG.replace_all(&cleaned, "");
    let cleaned = HYPHEN_RUN.replace_all(&cleaned, "-");
    let cleaned = cleaned.trim_matches('-');

    // "a/l" collapses to "a-l"; glue single-letter level abbreviations back
    let cleaned = match cleaned {
        "a-l" => "al",
        "o-l" => "ol",
        other => other,
    };

    lookup(GRADE_ALIASES, cleaned)
        .map(str::to_string)
        .unwrap_or_else(|| cleaned.to_string())
}

/// Canonical slug for a subject name. Unknown subjects pass through hyphenated.
pub fn normalize_subject(input: &str) -> String {
    let cleaned = hyphenate(input);
    lookup(SUBJECT_ALIASES, &cleaned)
        .map(str::to_string)
        .unwrap_or(cleaned)
}

/// Canonical slug for a medium using only the built-in aliases.
pub fn normalize_medium(input: &str) -> String {
    let cleaned = hyphenate(input);
    lookup(MEDIUM_ALIASES, &cleaned)
        .map(str::to_string)
        .unwrap_or(cleaned)
}

/// Whether a grade name is acceptable for folder creation.
pub fn is_valid_grade(input: &str) -> bool {
    if let Ok(n) = input.trim().parse::<u32>() {
        return (1..=13).contains(&n);
    }
    let slug = normalize_grade(input);
    !slug.is_empty() && slug.len() < 50
}

/// Distinct canonical subject slugs, sorted.
pub fn valid_subjects() -> Vec<&'static str> {
    let mut subjects: Vec<&'static str> = SUBJECT_ALIASES.iter().map(|(_, slug)| *slug).collect();
    subjects.sort_unstable();
    subjects.dedup();
    subjects
}

/// Strip path separators, `..` sequences and characters that are illegal in
/// filenames on common platforms, then trim surrounding whitespace.
pub fn sanitize_filename(input: &str) -> String {
    let mut name: String = input
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    // Removing one ".." can expose another ("...." -> ".." -> "")
    while name.contains("..") {
        name = name.replace("..", "");
    }
    name.trim().to_string()
}

/// Display name for a file that has no catalog row.
///
/// "1700000000000-Maths Paper.pdf" -> "Maths Paper"
pub fn display_name_from_filename(filename: &str) -> String {
    let stem = match filename.len().checked_sub(4) {
        Some(cut) if filename.is_char_boundary(cut) && filename[cut..].eq_ignore_ascii_case(".pdf") => {
            &filename[..cut]
        }
        _ => filename,
    };
    TIMESTAMP_PREFIX.replace(stem, "").into_owned()
}

/// Whether a filename carries a `.pdf` extension (any case).
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Normalizer for all three category kinds, carrying configured medium aliases.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    medium_aliases: BTreeMap<String, String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add medium aliases from configuration. Keys are hyphenated the same
    /// way user input is, so "Sinhala Medium" matches "sinhala-medium".
    pub fn with_medium_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (alias, slug) in aliases {
            self.medium_aliases
                .insert(hyphenate(alias.as_ref()), normalize_medium(slug.as_ref()));
        }
        self
    }

    pub fn medium(&self, input: &str) -> String {
        let cleaned = hyphenate(input);
        if let Some(slug) = self.medium_aliases.get(&cleaned) {
            return slug.clone();
        }
        normalize_medium(input)
    }

    /// Slug for a name of the given kind.
    pub fn slug(&self, kind: CategoryKind, input: &str) -> String {
        match kind {
            CategoryKind::Grade => normalize_grade(input),
            CategoryKind::Subject => normalize_subject(input),
            CategoryKind::Medium => self.medium(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numeric_grades_stay_numeric() {
        for n in 1..=13 {
            let s = n.to_string();
            assert_eq!(normalize_grade(&s), s);
        }
        assert_eq!(normalize_grade(" 7 "), "7");
        assert_eq!(normalize_grade("07"), "7");
    }

    #[test]
    fn test_out_of_range_numbers_become_slugs() {
        assert_eq!(normalize_grade("0"), "0");
        assert_eq!(normalize_grade("14"), "14");
    }

    #[test]
    fn test_grade_aliases() {
        assert_eq!(normalize_grade("grade-1"), "grade-01");
        assert_eq!(normalize_grade("grade-01"), "grade-01");
        assert_eq!(normalize_grade("Grade 01"), "grade-01");
        assert_eq!(normalize_grade("Grade 1"), "grade-01");
        assert_eq!(normalize_grade("GRADE  12"), "grade-12");
        assert_eq!(normalize_grade("Grade 13 (A/L)"), "grade-13-al");
        assert_eq!(normalize_grade("Grade 11 (O/L)"), "grade-11-ol");
        assert_eq!(normalize_grade("AL"), "advance-level");
        assert_eq!(normalize_grade("A/L"), "advance-level");
        assert_eq!(normalize_grade("Advanced Level"), "advance-level");
        assert_eq!(normalize_grade("o-level"), "ordinary-level");
    }

    #[test]
    fn test_unknown_grade_is_cleaned() {
        assert_eq!(normalize_grade("  Pre-School!! "), "pre-school");
        assert_eq!(normalize_grade("--Kinder  Garten--"), "kinder-garten");
        assert_eq!(normalize_grade("***"), "");
    }

    #[test]
    fn test_grade_normalization_is_idempotent() {
        let inputs = [
            "Grade 1",
            "grade-01",
            "Grade 13 (A/L)",
            "Advanced Level",
            "o/l",
            "Pre School",
            "10",
            "weird__Name",
        ];
        for input in inputs {
            let once = normalize_grade(input);
            assert_eq!(normalize_grade(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_subject_aliases() {
        assert_eq!(normalize_subject("Maths"), "mathematics");
        assert_eq!(normalize_subject("  ICT "), "information-technology");
        assert_eq!(normalize_subject("Computer Science"), "information-technology");
        assert_eq!(normalize_subject("Buddhism"), "religion");
        assert_eq!(normalize_subject("Health and Physical Education"), "physical-education");
        assert_eq!(normalize_subject("Political Science"), "political-science");
    }

    #[test]
    fn test_subject_normalization_is_idempotent() {
        for input in ["Maths", "ICT", "Art and Design", "Political   Science", "health"] {
            let once = normalize_subject(input);
            assert_eq!(normalize_subject(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_every_subject_slug_maps_to_itself() {
        for slug in valid_subjects() {
            assert_eq!(normalize_subject(slug), slug);
        }
    }

    #[test]
    fn test_medium_aliases() {
        assert_eq!(normalize_medium("Sinhala"), "sinhala");
        assert_eq!(normalize_medium("EN"), "english");
        assert_eq!(normalize_medium("Tamil"), "tamil");
        assert_eq!(normalize_medium("French"), "french");
    }

    #[test]
    fn test_configured_medium_aliases() {
        let normalizer = Normalizer::new().with_medium_aliases([("Sinhala Medium", "Sinhala")]);
        assert_eq!(normalizer.medium("sinhala medium"), "sinhala");
        assert_eq!(normalizer.medium("English"), "english");
        assert_eq!(normalizer.slug(CategoryKind::Medium, "SINHALA MEDIUM"), "sinhala");
        assert_eq!(normalizer.slug(CategoryKind::Grade, "Grade 2"), "grade-02");
        assert_eq!(normalizer.slug(CategoryKind::Subject, "maths"), "mathematics");
    }

    #[test]
    fn test_sanitize_traversal() {
        let out = sanitize_filename("../../etc/passwd");
        assert!(!out.contains('/'));
        assert!(!out.contains(".."));
        assert_eq!(out, "etcpasswd");
    }

    #[test]
    fn test_sanitize_nested_dots() {
        assert!(!sanitize_filename("....//....//x.pdf").contains(".."));
        assert!(!sanitize_filename("a.../b").contains(".."));
        assert_eq!(sanitize_filename(".../x.pdf"), ".x.pdf");
    }

    #[test]
    fn test_sanitize_illegal_characters() {
        assert_eq!(sanitize_filename("  my<paper>:2023?.pdf  "), "mypaper2023.pdf");
        assert_eq!(sanitize_filename("a\\b|c*d\"e.pdf"), "abcde.pdf");
        assert_eq!(sanitize_filename("nul\0byte.pdf"), "nulbyte.pdf");
        assert_eq!(sanitize_filename("Term Test 1.pdf"), "Term Test 1.pdf");
    }

    #[test]
    fn test_display_name_from_filename() {
        assert_eq!(display_name_from_filename("1700000000000-Maths Paper.pdf"), "Maths Paper");
        assert_eq!(display_name_from_filename("notes.PDF"), "notes");
        assert_eq!(display_name_from_filename("2023 paper.pdf"), "2023 paper");
        assert_eq!(display_name_from_filename("readme"), "readme");
    }

    #[test]
    fn test_is_pdf_filename() {
        assert!(is_pdf_filename("a.pdf"));
        assert!(is_pdf_filename("A.PDF"));
        assert!(!is_pdf_filename("a.pdf.txt"));
    }

    #[test]
    fn test_is_valid_grade() {
        assert!(is_valid_grade("1"));
        assert!(is_valid_grade("Grade 05"));
        assert!(!is_valid_grade("0"));
        assert!(!is_valid_grade("14"));
        assert!(!is_valid_grade("!!!"));
        assert!(!is_valid_grade(&"x".repeat(60)));
    }
}
