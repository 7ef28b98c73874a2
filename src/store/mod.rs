//! Vector-store abstraction.
//!
//! The indexing pipeline treats the vector store as an opaque collaborator:
//! upsert and delete by (collection, key), nothing else. Implementations
//! must be `Send + Sync` so per-collection executor workers can share one
//! client handle.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Abstract vector store consumed by the index executor.
///
/// Errors carry the transient/permanent split: transient failures are
/// retried with backoff by the executor, permanent failures are reported
/// per document.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the document stored under (collection, key).
    /// Returns the number of chunks written.
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        content: &str,
        metadata: &Value,
    ) -> Result<i64, StoreError>;

    /// Remove the document under (collection, key). Deleting a key that is
    /// not present is not an error.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;
}

/// Character budget per chunk. Roughly 700 tokens at ~4 chars/token.
pub const MAX_CHUNK_CHARS: usize = 2800;

/// Split document text into chunks on paragraph boundaries (`\n\n`),
/// hard-splitting paragraphs that exceed the budget on their own.
/// Always returns at least one chunk.
pub fn chunk_document(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![String::new()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current.is_empty() {
            trimmed.len()
        } else {
            current.len() + 2 + trimmed.len()
        };

        if would_be > MAX_CHUNK_CHARS && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if trimmed.len() > MAX_CHUNK_CHARS {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let limit = floor_char_boundary(remaining, MAX_CHUNK_CHARS);
                // Prefer a newline or space boundary when one exists.
                let split_at = if limit < remaining.len() {
                    remaining[..limit]
                        .rfind('\n')
                        .or_else(|| remaining[..limit].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(limit)
                } else {
                    limit
                };
                chunks.push(remaining[..split_at].trim().to_string());
                remaining = &remaining[split_at..];
            }
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(trimmed);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(text.trim().to_string());
    }
    chunks
}

fn floor_char_boundary(s: &str, mut at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    while at > 0 && !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}
