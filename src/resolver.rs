//! Collection resolution: path → (collection, document type).
//!
//! The resolver is a pure function of the route table it was built from.
//! Routes are evaluated deepest directory prefix first; ties break by
//! declared order; the first match wins. Two routes claiming the same
//! directory for the same document type but different collections are a
//! configuration error, rejected at construction before any mutation.

use globset::{Glob, GlobMatcher};

use crate::config::CollectionRoute;
use crate::error::{IndexError, ResolutionError, Result};
use crate::models::DocType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub collection: String,
    pub doc_type: DocType,
}

#[derive(Debug)]
struct RouteEntry {
    collection: String,
    doc_type: DocType,
    /// Normalized directory prefix, no trailing slash.
    directory: String,
    pattern: String,
    matcher: GlobMatcher,
}

#[derive(Debug)]
pub struct CollectionResolver {
    entries: Vec<RouteEntry>,
}

impl CollectionResolver {
    pub fn new(routes: &[CollectionRoute]) -> Result<Self> {
        let mut entries = Vec::new();

        for route in routes {
            let matcher = Glob::new(&route.pattern)
                .map_err(|e| {
                    IndexError::Config(format!(
                        "collection '{}': invalid pattern '{}': {}",
                        route.collection, route.pattern, e
                    ))
                })?
                .compile_matcher();

            for dir in &route.directories {
                let directory = normalize_dir(dir);
                if directory.is_empty() {
                    return Err(IndexError::Config(format!(
                        "collection '{}' declares an empty directory",
                        route.collection
                    )));
                }
                entries.push(RouteEntry {
                    collection: route.collection.clone(),
                    doc_type: route.doc_type,
                    directory,
                    pattern: route.pattern.clone(),
                    matcher: matcher.clone(),
                });
            }
        }

        // Reject contradictory tables: the same directory claimed for the same
        // document type by two different collections.
        for (i, a) in entries.iter().enumerate() {
            for b in entries.iter().skip(i + 1) {
                if a.doc_type == b.doc_type
                    && a.directory == b.directory
                    && a.collection != b.collection
                {
                    return Err(IndexError::Config(format!(
                        "directory '{}' (type {}) is claimed by both '{}' and '{}'",
                        a.directory, a.doc_type, a.collection, b.collection
                    )));
                }
            }
        }

        // Deepest prefix first; declared order breaks ties (stable sort).
        entries.sort_by(|a, b| depth(&b.directory).cmp(&depth(&a.directory)));

        Ok(Self { entries })
    }

    /// Resolve a root-relative path (forward slashes) to its collection and
    /// document type. First matching route wins.
    pub fn resolve(&self, rel_path: &str) -> std::result::Result<Resolution, ResolutionError> {
        let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);

        for entry in &self.entries {
            let in_dir = rel_path
                .strip_prefix(entry.directory.as_str())
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false);
            if in_dir && entry.matcher.is_match(file_name) {
                return Ok(Resolution {
                    collection: entry.collection.clone(),
                    doc_type: entry.doc_type,
                });
            }
        }

        Err(ResolutionError {
            path: rel_path.to_string(),
        })
    }

    /// All distinct collection names, in route order.
    pub fn collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        for entry in &self.entries {
            if !names.contains(&entry.collection) {
                names.push(entry.collection.clone());
            }
        }
        names
    }

    /// (collection, doc type, directory, pattern) rows for display.
    pub fn describe(&self) -> Vec<(String, DocType, String, String)> {
        self.entries
            .iter()
            .map(|e| {
                (
                    e.collection.clone(),
                    e.doc_type,
                    e.directory.clone(),
                    e.pattern.clone(),
                )
            })
            .collect()
    }
}

fn normalize_dir(dir: &str) -> String {
    dir.replace('\\', "/")
        .trim_matches('/')
        .trim()
        .to_string()
}

fn depth(dir: &str) -> usize {
    dir.split('/').count()
}
