//! Folder tree management.
//!
//! Mirrors catalog entities as directories:
//!
//! ```text
//! storage_root/
//! ├── syllabus/
//! │   └── grade-01/
//! │       └── mathematics/
//! │           ├── 1700000000000-unit-1.pdf
//! │           └── english/
//! │               └── 1700000000001-unit-2.pdf
//! └── past-papers/
//!     └── grade-01/
//!         └── mathematics/
//! ```
//!
//! Creation is idempotent ("already exists" is success). Deletion only ever
//! removes empty directories; populated subtrees are reported, never
//! cascaded. Missing directories read as empty.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::models::{FolderItem, PdfType};
use crate::normalize::is_pdf_filename;
use crate::storage::StorageError;

/// Whether `name` can be used as one directory level below a parent.
pub fn is_folder_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// A regular file found while scanning a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub filename: String,
    pub full_path: PathBuf,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// The type/grade/subject/medium directory tree under one storage root.
#[derive(Debug, Clone)]
pub struct FolderTree {
    root: PathBuf,
}

impl FolderTree {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn type_dir(&self, pdf_type: PdfType) -> PathBuf {
        self.root.join(pdf_type.dir_name())
    }

    pub fn grade_dir(&self, pdf_type: PdfType, grade: &str) -> PathBuf {
        self.type_dir(pdf_type).join(grade)
    }

    pub fn subject_dir(&self, pdf_type: PdfType, grade: &str, subject: &str) -> PathBuf {
        self.grade_dir(pdf_type, grade).join(subject)
    }

    /// Directory PDFs are written to: the subject folder, or its medium subfolder.
    pub fn leaf_dir(
        &self,
        pdf_type: PdfType,
        grade: &str,
        subject: &str,
        medium: Option<&str>,
    ) -> PathBuf {
        let dir = self.subject_dir(pdf_type, grade, subject);
        match medium {
            Some(medium) => dir.join(medium),
            None => dir,
        }
    }

    /// Path relative to the storage root, with `/` separators.
    pub fn relative_path(&self, full_path: &Path) -> Option<String> {
        let rel = full_path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Whether `dir` sits at `type/grade/subject/medium` depth under the root.
    pub fn is_medium_dir(&self, dir: &Path) -> bool {
        dir.strip_prefix(&self.root)
            .map(|rel| rel.components().count() == 4)
            .unwrap_or(false)
    }

    /// Create `path` and any missing parents. Returns the directories that
    /// did not exist before, outermost first.
    async fn ensure_dir(&self, path: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let mut missing = Vec::new();
        for ancestor in path.ancestors() {
            if fs::try_exists(ancestor).await? {
                break;
            }
            missing.push(ancestor.to_path_buf());
            if ancestor == self.root {
                break;
            }
        }
        missing.reverse();

        if !missing.is_empty() {
            fs::create_dir_all(path).await?;
            for dir in &missing {
                info!("Created folder {:?}", dir);
            }
        }
        Ok(missing)
    }

    /// Create `root/type/grade`.
    pub async fn ensure_grade_folder(
        &self,
        pdf_type: PdfType,
        grade: &str,
    ) -> Result<Vec<PathBuf>, StorageError> {
        self.ensure_dir(&self.grade_dir(pdf_type, grade)).await
    }

    /// Create the subject folder under both type subtrees.
    pub async fn ensure_subject_folder(
        &self,
        grade: &str,
        subject: &str,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let mut created = Vec::new();
        for pdf_type in PdfType::ALL {
            created.extend(self.ensure_dir(&self.grade_dir(pdf_type, grade)).await?);
        }
        for pdf_type in PdfType::ALL {
            created.extend(
                self.ensure_dir(&self.subject_dir(pdf_type, grade, subject))
                    .await?,
            );
        }
        Ok(created)
    }

    /// Create a medium folder below one type's subject folder.
    pub async fn ensure_medium_folder(
        &self,
        pdf_type: PdfType,
        grade: &str,
        subject: &str,
        medium: &str,
    ) -> Result<Vec<PathBuf>, StorageError> {
        self.ensure_dir(&self.leaf_dir(pdf_type, grade, subject, Some(medium)))
            .await
    }

    /// True if `path` is a directory with at least one entry.
    pub async fn has_entries(&self, path: &Path) -> Result<bool, StorageError> {
        let mut entries = match fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(entries.next_entry().await?.is_some())
    }

    /// Number of entries directly inside `path`; 0 when missing or unreadable.
    pub async fn count_entries(&self, path: &Path) -> usize {
        let Ok(mut entries) = fs::read_dir(path).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(_)) = entries.next_entry().await {
            count += 1;
        }
        count
    }

    /// Remove every existing directory in `paths`, but only if all of them
    /// are empty. Nothing is removed when any one is populated.
    async fn remove_empty_dirs(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, StorageError> {
        for path in paths {
            if self.has_entries(path).await? {
                return Err(StorageError::NotEmpty(path.clone()));
            }
        }

        let mut removed = Vec::new();
        for path in paths {
            match fs::remove_dir(path).await {
                Ok(()) => {
                    info!("Removed folder {:?}", path);
                    removed.push(path.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Remove the grade folder from both type subtrees if both are empty.
    pub async fn delete_grade_folders(&self, grade: &str) -> Result<Vec<PathBuf>, StorageError> {
        let paths: Vec<PathBuf> = PdfType::ALL
            .iter()
            .map(|t| self.grade_dir(*t, grade))
            .collect();
        self.remove_empty_dirs(&paths).await
    }

    /// Remove the subject folder from both type subtrees if both are empty.
    pub async fn delete_subject_folders(
        &self,
        grade: &str,
        subject: &str,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let paths: Vec<PathBuf> = PdfType::ALL
            .iter()
            .map(|t| self.subject_dir(*t, grade, subject))
            .collect();
        self.remove_empty_dirs(&paths).await
    }

    /// Resolve a client-supplied relative path to a file under the root.
    ///
    /// Leading separators are dropped; `..`, absolute prefixes and empty
    /// paths are rejected, as is anything that (through symlinks) resolves
    /// outside the root.
    pub async fn resolve_safe_path(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let invalid = || StorageError::InvalidPath("invalid file path".to_string());

        let cleaned = relative.replace('\\', "/");
        let cleaned = cleaned.trim_start_matches('/');
        if cleaned.trim().is_empty() {
            return Err(invalid());
        }

        let rel = Path::new(cleaned);
        for component in rel.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    warn!("Rejected unsafe path {:?}", relative);
                    return Err(invalid());
                }
            }
        }

        let full = self.root.join(rel);
        if !full.starts_with(&self.root) {
            return Err(invalid());
        }

        // Symlinks inside the tree must not lead out of it
        if let (Ok(real_root), Ok(real_full)) = (
            fs::canonicalize(&self.root).await,
            fs::canonicalize(&full).await,
        ) {
            if !real_full.starts_with(&real_root) {
                warn!("Rejected path escaping storage root {:?}", relative);
                return Err(invalid());
            }
        }

        Ok(full)
    }

    /// Names of the subdirectories of `path`, sorted. Missing reads as empty.
    pub async fn list_dirs(&self, path: &Path) -> Result<Vec<String>, StorageError> {
        let mut entries = match fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!("Skipping non UTF-8 folder name {:?}", raw),
            }
        }
        names.sort();
        debug!("Found {} folders in {:?}", names.len(), path);
        Ok(names)
    }

    /// PDF files directly inside `path`, sorted by filename.
    pub async fn list_pdf_files(&self, path: &Path) -> Result<Vec<FileEntry>, StorageError> {
        let mut entries = match fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !is_pdf_filename(&filename) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            files.push(FileEntry {
                filename,
                full_path: entry.path(),
                size: meta.len(),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Type folders under the root with their entry counts.
    pub async fn list_types(&self) -> Result<Vec<FolderItem>, StorageError> {
        let mut items = Vec::new();
        for name in self.list_dirs(&self.root).await? {
            let item_count = self.count_entries(&self.root.join(&name)).await;
            items.push(FolderItem { name, item_count });
        }
        Ok(items)
    }

    /// Write a new file; never overwrites.
    pub async fn write_new_file(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        use tokio::io::AsyncWriteExt;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await
        {
            // Do not leave a truncated file behind
            let _ = fs::remove_file(path).await;
            return Err(e.into());
        }

        info!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    /// Remove a file. Returns false if it was already gone.
    pub async fn remove_file(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                info!("Removed file {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `path` if it is an empty directory. Errors are swallowed.
    pub async fn prune_if_empty(&self, path: &Path) -> bool {
        if path == self.root || !path.starts_with(&self.root) {
            return false;
        }
        match self.has_entries(path).await {
            Ok(false) => fs::remove_dir(path).await.is_ok(),
            _ => false,
        }
    }

    /// Open a file for streaming, returning it with its size.
    pub async fn open(&self, path: &Path) -> Result<(fs::File, u64), StorageError> {
        let meta = match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::PathNotFound(path.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::PathNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let file = fs::File::open(path).await?;
        Ok((file, meta.len()))
    }

    pub async fn file_exists(&self, path: &Path) -> bool {
        matches!(fs::metadata(path).await, Ok(meta) if meta.is_file())
    }

    /// PDF files in a subject folder and in each medium folder below it.
    pub async fn list_subject_pdf_files(&self, subject_dir: &Path) -> Result<Vec<FileEntry>, StorageError> {
        let mut files = self.list_pdf_files(subject_dir).await?;
        for medium in self.list_dirs(subject_dir).await? {
            files.extend(self.list_pdf_files(&subject_dir.join(medium)).await?);
        }
        Ok(files)
    }

    /// Every PDF file at subject or medium depth, across both types.
    pub async fn list_all_pdf_files(&self) -> Result<Vec<FileEntry>, StorageError> {
        let mut files = Vec::new();
        for pdf_type in PdfType::ALL {
            let type_dir = self.type_dir(pdf_type);
            for grade in self.list_dirs(&type_dir).await? {
                let grade_dir = type_dir.join(&grade);
                for subject in self.list_dirs(&grade_dir).await? {
                    files.extend(self.list_subject_pdf_files(&grade_dir.join(subject)).await?);
                }
            }
        }
        debug!("Found {} PDF files under {:?}", files.len(), self.root);
        Ok(files)
    }

    /// Whether any `type/grade/subject/medium` folder holds entries.
    pub async fn medium_in_use(&self, medium: &str) -> Result<bool, StorageError> {
        for pdf_type in PdfType::ALL {
            let type_dir = self.type_dir(pdf_type);
            for grade in self.list_dirs(&type_dir).await? {
                let grade_dir = type_dir.join(&grade);
                for subject in self.list_dirs(&grade_dir).await? {
                    if self.has_entries(&grade_dir.join(&subject).join(medium)).await? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tree(tmp: &TempDir) -> FolderTree {
        FolderTree::new(tmp.path().join("storage"))
    }

    #[tokio::test]
    async fn test_ensure_grade_folder_reports_new_segments() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);

        let created = tree
            .ensure_grade_folder(PdfType::Syllabus, "grade-01")
            .await
            .unwrap();
        assert_eq!(
            created,
            vec![
                tree.root().to_path_buf(),
                tree.type_dir(PdfType::Syllabus),
                tree.grade_dir(PdfType::Syllabus, "grade-01"),
            ]
        );

        let again = tree
            .ensure_grade_folder(PdfType::Syllabus, "grade-01")
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_subject_folder_provisions_both_types() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);

        tree.ensure_subject_folder("grade-01", "mathematics")
            .await
            .unwrap();

        for pdf_type in PdfType::ALL {
            assert!(tree.subject_dir(pdf_type, "grade-01", "mathematics").is_dir());
        }
        assert!(tree
            .ensure_subject_folder("grade-01", "mathematics")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_has_entries() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        let dir = tree.grade_dir(PdfType::PastPapers, "grade-05");

        assert!(!tree.has_entries(&dir).await.unwrap());
        std::fs::create_dir_all(&dir).unwrap();
        assert!(!tree.has_entries(&dir).await.unwrap());
        std::fs::write(dir.join("x.pdf"), b"%PDF").unwrap();
        assert!(tree.has_entries(&dir).await.unwrap());
        assert_eq!(tree.count_entries(&dir).await, 1);
    }

    #[tokio::test]
    async fn test_delete_grade_folders_when_empty() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        for pdf_type in PdfType::ALL {
            tree.ensure_grade_folder(pdf_type, "grade-02").await.unwrap();
        }

        let removed = tree.delete_grade_folders("grade-02").await.unwrap();
        assert_eq!(removed.len(), 2);
        for pdf_type in PdfType::ALL {
            assert!(!tree.grade_dir(pdf_type, "grade-02").exists());
        }
    }

    #[tokio::test]
    async fn test_delete_grade_folders_blocked_by_subject() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        tree.ensure_subject_folder("grade-03", "science").await.unwrap();
        std::fs::write(
            tree.subject_dir(PdfType::PastPapers, "grade-03", "science")
                .join("paper.pdf"),
            b"%PDF",
        )
        .unwrap();

        let err = tree.delete_grade_folders("grade-03").await.unwrap_err();
        assert!(matches!(err, StorageError::NotEmpty(_)));
        for pdf_type in PdfType::ALL {
            assert!(tree.grade_dir(pdf_type, "grade-03").is_dir());
        }
    }

    #[tokio::test]
    async fn test_delete_subject_folders() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        tree.ensure_subject_folder("grade-04", "history").await.unwrap();
        let file = tree
            .subject_dir(PdfType::Syllabus, "grade-04", "history")
            .join("a.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        assert!(matches!(
            tree.delete_subject_folders("grade-04", "history").await,
            Err(StorageError::NotEmpty(_))
        ));

        std::fs::remove_file(&file).unwrap();
        let removed = tree
            .delete_subject_folders("grade-04", "history")
            .await
            .unwrap();
        assert_eq!(removed.len(), 2);
        // Grade folders stay
        assert!(tree.grade_dir(PdfType::Syllabus, "grade-04").is_dir());
    }

    #[tokio::test]
    async fn test_delete_missing_folders_is_noop() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        assert!(tree.delete_grade_folders("grade-09").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_safe_path() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);

        let ok = tree
            .resolve_safe_path("past-papers/grade-01/mathematics/english/doc.pdf")
            .await
            .unwrap();
        assert_eq!(
            ok,
            tree.root()
                .join("past-papers/grade-01/mathematics/english/doc.pdf")
        );

        let leading = tree.resolve_safe_path("/syllabus/a.pdf").await.unwrap();
        assert_eq!(leading, tree.root().join("syllabus/a.pdf"));

        for bad in [
            "../outside.pdf",
            "syllabus/../../outside.pdf",
            "syllabus\\..\\..\\outside.pdf",
            "",
            "///",
        ] {
            assert!(
                matches!(
                    tree.resolve_safe_path(bad).await,
                    Err(StorageError::InvalidPath(_))
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_safe_path_rejects_symlink_escape() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        std::fs::create_dir_all(tree.root()).unwrap();
        let outside = tmp.path().join("secret.pdf");
        std::fs::write(&outside, b"%PDF").unwrap();
        std::os::unix::fs::symlink(&outside, tree.root().join("link.pdf")).unwrap();

        assert!(tree.resolve_safe_path("link.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_list_dirs_and_pdf_files() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        let subject = tree.subject_dir(PdfType::Syllabus, "grade-01", "art");
        std::fs::create_dir_all(subject.join("english")).unwrap();
        std::fs::write(subject.join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(subject.join("a.PDF"), b"%PDF").unwrap();
        std::fs::write(subject.join("notes.txt"), b"x").unwrap();

        assert_eq!(tree.list_dirs(&subject).await.unwrap(), vec!["english"]);
        assert!(tree
            .list_dirs(&tmp.path().join("missing"))
            .await
            .unwrap()
            .is_empty());

        let files = tree.list_pdf_files(&subject).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
        assert_eq!(files[1].size, 8);
        assert!(files[1].modified_at.is_some());
    }

    #[tokio::test]
    async fn test_write_new_file_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        std::fs::create_dir_all(tree.root()).unwrap();
        let path = tree.root().join("x.pdf");

        tree.write_new_file(&path, b"first").await.unwrap();
        let err = tree.write_new_file(&path, b"second").await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_remove_and_prune() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        let medium = tree.leaf_dir(PdfType::Syllabus, "grade-01", "art", Some("tamil"));
        std::fs::create_dir_all(&medium).unwrap();
        let file = medium.join("x.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        assert!(!tree.prune_if_empty(&medium).await);
        assert!(tree.remove_file(&file).await.unwrap());
        assert!(!tree.remove_file(&file).await.unwrap());
        assert!(tree.prune_if_empty(&medium).await);
        assert!(!medium.exists());
        assert!(!tree.prune_if_empty(tree.root()).await);
    }

    #[tokio::test]
    async fn test_open_reports_size() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        std::fs::create_dir_all(tree.root()).unwrap();
        let path = tree.root().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let (_file, size) = tree.open(&path).await.unwrap();
        assert_eq!(size, 8);
        assert!(matches!(
            tree.open(&tree.root().join("nope.pdf")).await,
            Err(StorageError::PathNotFound(_))
        ));
        assert!(matches!(
            tree.open(tree.root()).await,
            Err(StorageError::PathNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_medium_in_use() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        let medium = tree.leaf_dir(PdfType::PastPapers, "grade-07", "science", Some("english"));
        std::fs::create_dir_all(&medium).unwrap();

        assert!(!tree.medium_in_use("english").await.unwrap());
        std::fs::write(medium.join("p.pdf"), b"%PDF").unwrap();
        assert!(tree.medium_in_use("english").await.unwrap());
        assert!(!tree.medium_in_use("tamil").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_types_and_relative_path() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        tree.ensure_subject_folder("grade-01", "art").await.unwrap();

        let types = tree.list_types().await.unwrap();
        assert_eq!(
            types,
            vec![
                FolderItem {
                    name: "past-papers".to_string(),
                    item_count: 1
                },
                FolderItem {
                    name: "syllabus".to_string(),
                    item_count: 1
                },
            ]
        );

        let full = tree.subject_dir(PdfType::Syllabus, "grade-01", "art").join("a.pdf");
        assert_eq!(
            tree.relative_path(&full).as_deref(),
            Some("syllabus/grade-01/art/a.pdf")
        );
        assert!(tree.relative_path(Path::new("/elsewhere/a.pdf")).is_none());
    }

    #[test]
    fn test_folder_segments_and_depth() {
        for ok in ["english", "grade-01", "a.b"] {
            assert!(is_folder_segment(ok), "{ok}");
        }
        for bad in ["", ".", "..", "a/b", "..\\x", "../.."] {
            assert!(!is_folder_segment(bad), "{bad}");
        }

        let tree = FolderTree::new(PathBuf::from("/data/storage"));
        let medium = tree.leaf_dir(PdfType::Syllabus, "grade-01", "art", Some("tamil"));
        assert!(tree.is_medium_dir(&medium));
        assert!(!tree.is_medium_dir(&tree.subject_dir(PdfType::Syllabus, "grade-01", "art")));
        assert!(!tree.is_medium_dir(Path::new("/elsewhere/a/b/c/d")));
    }

    #[tokio::test]
    async fn test_list_all_pdf_files() {
        let tmp = TempDir::new().unwrap();
        let tree = tree(&tmp);
        let subject = tree.subject_dir(PdfType::Syllabus, "grade-01", "art");
        let medium = tree.leaf_dir(PdfType::PastPapers, "grade-02", "science", Some("tamil"));
        std::fs::create_dir_all(&subject).unwrap();
        std::fs::create_dir_all(&medium).unwrap();
        std::fs::write(subject.join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(medium.join("b.pdf"), b"%PDF").unwrap();
        // Files above subject depth are not part of the tree
        std::fs::write(tree.type_dir(PdfType::Syllabus).join("stray.pdf"), b"%PDF").unwrap();

        let mut found: Vec<String> = tree
            .list_all_pdf_files()
            .await
            .unwrap()
            .iter()
            .filter_map(|f| tree.relative_path(&f.full_path))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                "past-papers/grade-02/science/tamil/b.pdf",
                "syllabus/grade-01/art/a.pdf"
            ]
        );
    }
}
