//! Core data types that flow through the indexing pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of specification document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    Feature,
    Ts4,
    UiIntent,
    Adr,
    Business,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Feature => "feature",
            DocType::Ts4 => "ts4",
            DocType::UiIntent => "ui-intent",
            DocType::Adr => "adr",
            DocType::Business => "business",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feature" => Ok(DocType::Feature),
            "ts4" => Ok(DocType::Ts4),
            "ui-intent" => Ok(DocType::UiIntent),
            "adr" => Ok(DocType::Adr),
            "business" => Ok(DocType::Business),
            other => Err(format!(
                "unknown document type '{}'. Valid types: feature, ts4, ui-intent, adr, business",
                other
            )),
        }
    }
}

/// A scanned specification file.
///
/// Identity is the root-relative path, normalized to forward slashes.
#[derive(Debug, Clone)]
pub struct Document {
    /// Root-relative path with `/` separators. The vector-store key.
    pub rel_path: String,
    /// File bytes. Empty for unmapped documents, whose content is never
    /// hashed or indexed.
    pub content: Vec<u8>,
    /// Resolved document type, when the path matches a collection route.
    pub doc_type: Option<DocType>,
    /// Last-modified unix timestamp (best effort, 0 when unavailable).
    pub modified_at: i64,
}

/// Persisted record of the last successfully indexed state of one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintRecord {
    pub path: String,
    pub hash: String,
    pub collection: String,
    pub indexed_at: i64,
    pub chunk_count: i64,
}

/// A planned action against the vector store.
///
/// Created by the planner, consumed by the executor.
#[derive(Debug, Clone)]
pub enum IndexOperation {
    Insert {
        doc: Document,
        collection: String,
        hash: String,
    },
    Update {
        doc: Document,
        collection: String,
        hash: String,
        previous: FingerprintRecord,
    },
    Delete {
        path: String,
        collection: String,
    },
}

impl IndexOperation {
    pub fn path(&self) -> &str {
        match self {
            IndexOperation::Insert { doc, .. } | IndexOperation::Update { doc, .. } => {
                &doc.rel_path
            }
            IndexOperation::Delete { path, .. } => path,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            IndexOperation::Insert { collection, .. }
            | IndexOperation::Update { collection, .. }
            | IndexOperation::Delete { collection, .. } => collection,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, IndexOperation::Delete { .. })
    }
}
