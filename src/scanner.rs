//! Filesystem scanner: walks the document root and yields candidate files.
//!
//! Each run re-scans from scratch; no streaming state is carried between
//! runs. Unreadable files and walk errors are collected as warnings and
//! surfaced in the report, never fatal.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{IndexError, Result};
use crate::models::{DocType, Document};
use crate::resolver::CollectionResolver;

/// Restricts a scan to explicit paths, one document type, or one directory.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Root-relative normalized paths, when the caller names specific files.
    pub paths: Vec<String>,
    pub doc_type: Option<DocType>,
    /// Root-relative normalized directory prefix.
    pub directory: Option<String>,
}

impl ScanFilter {
    /// Build a filter from raw CLI arguments, normalizing paths against the
    /// root. The directory filter must name an existing directory.
    pub fn from_args(
        root: &Path,
        paths: &[String],
        doc_type: Option<DocType>,
        directory: Option<&str>,
    ) -> Result<Self> {
        let paths = paths
            .iter()
            .map(|p| normalize_rel(root, Path::new(p)))
            .collect();

        let directory = match directory {
            Some(dir) => {
                let rel = normalize_rel(root, Path::new(dir));
                if !root.join(&rel).is_dir() {
                    return Err(IndexError::InvalidPath(format!(
                        "directory not found: {}",
                        dir
                    )));
                }
                Some(rel)
            }
            None => None,
        };

        Ok(Self {
            paths,
            doc_type,
            directory,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScanWarning {
    pub path: String,
    pub reason: String,
}

pub struct Scan {
    pub documents: Vec<Document>,
    pub warnings: Vec<ScanWarning>,
}

/// Directories never worth scanning, including our own state dir.
fn exclude_set() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in ["**/.git/**", "**/.specdex/**", "**/target/**", "**/node_modules/**"] {
        builder.add(Glob::new(pattern).expect("static exclude pattern"));
    }
    builder.build().expect("static exclude set")
}

/// Walk `root` applying `filter`, producing a deterministic, path-sorted
/// document list. The resolver is consulted only to tag document types (and
/// to enforce a `--type` restriction); routing decisions stay in the planner.
pub fn scan(root: &Path, resolver: &CollectionResolver, filter: &ScanFilter) -> Result<Scan> {
    if !root.is_dir() {
        return Err(IndexError::InvalidPath(format!(
            "document root not found: {}",
            root.display()
        )));
    }

    let mut documents = Vec::new();
    let mut warnings = Vec::new();

    if !filter.paths.is_empty() {
        for rel in &filter.paths {
            let abs = root.join(rel);
            if !abs.is_file() {
                warnings.push(ScanWarning {
                    path: rel.clone(),
                    reason: "file not found".to_string(),
                });
                continue;
            }
            if let Some(doc) = read_document(root, &abs, resolver, filter, &mut warnings) {
                documents.push(doc);
            }
        }
    } else {
        let base = match &filter.directory {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        let excludes = exclude_set();

        for entry in WalkDir::new(&base).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| normalize_rel(root, p))
                        .unwrap_or_else(|| base.display().to_string());
                    warnings.push(ScanWarning {
                        path,
                        reason: format!("walk error: {}", e),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = normalize_rel(root, entry.path());
            if excludes.is_match(&rel) {
                continue;
            }
            if let Some(doc) = read_document(root, entry.path(), resolver, filter, &mut warnings) {
                documents.push(doc);
            }
        }
    }

    documents.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    documents.dedup_by(|a, b| a.rel_path == b.rel_path);

    Ok(Scan {
        documents,
        warnings,
    })
}

fn read_document(
    root: &Path,
    abs: &Path,
    resolver: &CollectionResolver,
    filter: &ScanFilter,
    warnings: &mut Vec<ScanWarning>,
) -> Option<Document> {
    let rel = normalize_rel(root, abs);
    let doc_type = resolver.resolve(&rel).ok().map(|r| r.doc_type);

    // A type restriction only admits documents that resolve to that type.
    if let Some(wanted) = filter.doc_type {
        if doc_type != Some(wanted) {
            return None;
        }
    }

    // Unmapped files are only ever reported by path; their bytes are never
    // hashed or indexed, so they are not read.
    let content = if doc_type.is_some() {
        match std::fs::read(abs) {
            Ok(content) => content,
            Err(e) => {
                warnings.push(ScanWarning {
                    path: rel,
                    reason: format!("unreadable: {}", e),
                });
                return None;
            }
        }
    } else {
        Vec::new()
    };

    let modified_at = std::fs::metadata(abs)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Some(Document {
        rel_path: rel,
        content,
        doc_type,
        modified_at,
    })
}

/// Root-relative path with forward slashes. Absolute inputs are stripped of
/// the root prefix when possible.
pub fn normalize_rel(root: &Path, path: &Path) -> String {
    let rel: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let mut normalized = rel.to_string_lossy().to_string();
    if normalized.contains('\\') {
        normalized = normalized.replace('\\', "/");
    }
    normalized.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_routes;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CollectionResolver) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("docs/features")).unwrap();
        fs::create_dir_all(root.join("docs/ts4")).unwrap();
        fs::create_dir_all(root.join("docs/notes")).unwrap();
        fs::write(root.join("docs/features/a.feature"), "Feature: a").unwrap();
        fs::write(root.join("docs/features/b.feature"), "Feature: b").unwrap();
        fs::write(root.join("docs/ts4/auth.ts4"), "ts4 spec").unwrap();
        fs::write(root.join("docs/notes/todo.md"), "todo").unwrap();
        let resolver = CollectionResolver::new(&default_routes()).unwrap();
        (tmp, resolver)
    }

    #[test]
    fn scans_everything_sorted() {
        let (tmp, resolver) = setup();
        let scan = scan(tmp.path(), &resolver, &ScanFilter::default()).unwrap();
        let paths: Vec<&str> = scan.documents.iter().map(|d| d.rel_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "docs/features/a.feature",
                "docs/features/b.feature",
                "docs/notes/todo.md",
                "docs/ts4/auth.ts4",
            ]
        );
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn unmapped_files_are_listed_without_reading_content() {
        let (tmp, resolver) = setup();
        // Large file outside every route: its bytes must not be loaded.
        fs::write(
            tmp.path().join("docs/notes/dump.bin"),
            vec![0u8; 4 * 1024 * 1024],
        )
        .unwrap();

        let scan = scan(tmp.path(), &resolver, &ScanFilter::default()).unwrap();
        let dump = scan
            .documents
            .iter()
            .find(|d| d.rel_path == "docs/notes/dump.bin")
            .unwrap();
        assert!(dump.content.is_empty());
        assert_eq!(dump.doc_type, None);

        let mapped = scan
            .documents
            .iter()
            .find(|d| d.rel_path == "docs/features/a.feature")
            .unwrap();
        assert_eq!(mapped.content, b"Feature: a");
    }

    #[test]
    fn type_filter_restricts_to_resolved_type() {
        let (tmp, resolver) = setup();
        let filter =
            ScanFilter::from_args(tmp.path(), &[], Some(DocType::Feature), None).unwrap();
        let scan = scan(tmp.path(), &resolver, &filter).unwrap();
        assert_eq!(scan.documents.len(), 2);
        assert!(scan
            .documents
            .iter()
            .all(|d| d.doc_type == Some(DocType::Feature)));
    }

    #[test]
    fn directory_filter_restricts_walk() {
        let (tmp, resolver) = setup();
        let filter = ScanFilter::from_args(tmp.path(), &[], None, Some("docs/ts4")).unwrap();
        let scan = scan(tmp.path(), &resolver, &filter).unwrap();
        assert_eq!(scan.documents.len(), 1);
        assert_eq!(scan.documents[0].rel_path, "docs/ts4/auth.ts4");
    }

    #[test]
    fn missing_directory_filter_is_invalid_path() {
        let (tmp, _resolver) = setup();
        let err = ScanFilter::from_args(tmp.path(), &[], None, Some("docs/nope")).unwrap_err();
        assert!(matches!(err, IndexError::InvalidPath(_)));
    }

    #[test]
    fn explicit_paths_scanned_directly() {
        let (tmp, resolver) = setup();
        let filter = ScanFilter::from_args(
            tmp.path(),
            &["docs/features/a.feature".to_string()],
            None,
            None,
        )
        .unwrap();
        let scan = scan(tmp.path(), &resolver, &filter).unwrap();
        assert_eq!(scan.documents.len(), 1);
        assert_eq!(scan.documents[0].rel_path, "docs/features/a.feature");
    }

    #[test]
    fn missing_explicit_path_warns() {
        let (tmp, resolver) = setup();
        let filter = ScanFilter::from_args(
            tmp.path(),
            &["docs/features/gone.feature".to_string()],
            None,
            None,
        )
        .unwrap();
        let scan = scan(tmp.path(), &resolver, &filter).unwrap();
        assert!(scan.documents.is_empty());
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scan.warnings[0].reason, "file not found");
    }

    #[test]
    fn state_dir_is_excluded() {
        let (tmp, resolver) = setup();
        fs::create_dir_all(tmp.path().join(".specdex/data")).unwrap();
        fs::write(tmp.path().join(".specdex/data/junk.md"), "junk").unwrap();
        let scan = scan(tmp.path(), &resolver, &ScanFilter::default()).unwrap();
        assert!(scan
            .documents
            .iter()
            .all(|d| !d.rel_path.starts_with(".specdex")));
    }
}
