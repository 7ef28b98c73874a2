//! TOML configuration parsing.
//!
//! All settings have defaults; a missing config file means "use the built-in
//! route table with state under `.specdex/`". The route table is loaded once
//! per run and treated as immutable for that run.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};
use crate::models::DocType;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default = "default_routes")]
    pub collections: Vec<CollectionRoute>,
}

/// Locations of persistent state, relative to the document root unless
/// absolute.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_fingerprint_db")]
    pub fingerprint_db: PathBuf,
    #[serde(default = "default_vector_db")]
    pub vector_db: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fingerprint_db: default_fingerprint_db(),
            vector_db: default_vector_db(),
        }
    }
}

fn default_fingerprint_db() -> PathBuf {
    PathBuf::from(".specdex/data/index.sqlite")
}

fn default_vector_db() -> PathBuf {
    PathBuf::from(".specdex/data/store.sqlite")
}

impl StoreConfig {
    pub fn fingerprint_db_under(&self, root: &Path) -> PathBuf {
        resolve_under(root, &self.fingerprint_db)
    }

    pub fn vector_db_under(&self, root: &Path) -> PathBuf {
        resolve_under(root, &self.vector_db)
    }
}

fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Executor tuning knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Operations per vector-store batch (one fingerprint commit per batch).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retry attempts for transient vector-store errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff between retries; doubles per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Collections whose batches may be applied concurrently.
    #[serde(default = "default_max_concurrent_collections")]
    pub max_concurrent_collections: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_concurrent_collections: default_max_concurrent_collections(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    200
}
fn default_max_concurrent_collections() -> usize {
    4
}

/// One row of the routing table: files under `directories` whose name
/// matches `pattern` belong to `collection` and carry `doc_type`.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectionRoute {
    #[serde(rename = "name")]
    pub collection: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub directories: Vec<String>,
    pub pattern: String,
}

impl CollectionRoute {
    fn new(collection: &str, doc_type: DocType, directories: &[&str], pattern: &str) -> Self {
        Self {
            collection: collection.to_string(),
            doc_type,
            directories: directories.iter().map(|d| d.to_string()).collect(),
            pattern: pattern.to_string(),
        }
    }
}

/// The built-in route table, matching the standard docs layout.
pub fn default_routes() -> Vec<CollectionRoute> {
    vec![
        CollectionRoute::new(
            "business-and-architecture",
            DocType::Adr,
            &["docs/adrs"],
            "*.md",
        ),
        CollectionRoute::new(
            "business-and-architecture",
            DocType::Business,
            &["docs/business"],
            "*.md",
        ),
        CollectionRoute::new("features", DocType::Feature, &["docs/features"], "*.feature"),
        CollectionRoute::new("tech-specs", DocType::Ts4, &["docs/ts4"], "*.ts4"),
        CollectionRoute::new("uisi", DocType::UiIntent, &["docs/ui-intent"], "*.yaml"),
    ]
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Parse and validation failures are configuration errors.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config {
            collections: default_routes(),
            ..Config::default()
        });
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| IndexError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    if config.index.batch_size == 0 {
        return Err(IndexError::Config("index.batch_size must be > 0".into()));
    }
    if config.index.max_concurrent_collections == 0 {
        return Err(IndexError::Config(
            "index.max_concurrent_collections must be > 0".into(),
        ));
    }
    if config.collections.is_empty() {
        return Err(IndexError::Config(
            "at least one [[collections]] route is required".into(),
        ));
    }
    for route in &config.collections {
        if route.collection.trim().is_empty() {
            return Err(IndexError::Config("collection name must not be empty".into()));
        }
        if route.directories.is_empty() {
            return Err(IndexError::Config(format!(
                "collection '{}' declares no directories",
                route.collection
            )));
        }
        if route.pattern.trim().is_empty() {
            return Err(IndexError::Config(format!(
                "collection '{}' declares an empty pattern",
                route.collection
            )));
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/specdex.toml")).unwrap();
        assert_eq!(config.collections.len(), 5);
        assert_eq!(config.index.batch_size, 32);
    }

    #[test]
    fn parses_full_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("specdex.toml");
        std::fs::write(
            &path,
            r#"
[index]
batch_size = 8
max_retries = 1

[store]
fingerprint_db = "state/fp.sqlite"

[[collections]]
name = "features"
type = "feature"
directories = ["specs/features"]
pattern = "*.feature"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.index.batch_size, 8);
        assert_eq!(config.index.max_retries, 1);
        assert_eq!(config.collections.len(), 1);
        assert_eq!(config.collections[0].doc_type, DocType::Feature);
        assert_eq!(
            config.store.fingerprint_db_under(Path::new("/root")),
            PathBuf::from("/root/state/fp.sqlite")
        );
    }

    #[test]
    fn zero_batch_size_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("specdex.toml");
        std::fs::write(&path, "[index]\nbatch_size = 0\n").unwrap();
        assert!(matches!(load_config(&path), Err(IndexError::Config(_))));
    }

    #[test]
    fn empty_route_directories_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("specdex.toml");
        std::fs::write(
            &path,
            r#"
[[collections]]
name = "features"
type = "feature"
directories = []
pattern = "*.feature"
"#,
        )
        .unwrap();
        assert!(matches!(load_config(&path), Err(IndexError::Config(_))));
    }
}
