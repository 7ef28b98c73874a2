//! In-memory [`VectorStore`](super::VectorStore) for tests.
//!
//! `BTreeMap`s behind `std::sync::RwLock` for thread safety and
//! deterministic iteration. Also the host for failure-injecting wrappers
//! in the integration tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{chunk_document, VectorStore};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub content: String,
    pub metadata: Value,
    pub chunk_count: i64,
}

#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, StoredDocument>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn total_documents(&self) -> usize {
        self.collections
            .read()
            .unwrap()
            .values()
            .map(|docs| docs.len())
            .sum()
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<StoredDocument> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    pub fn contains(&self, collection: &str, key: &str) -> bool {
        self.get(collection, key).is_some()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        content: &str,
        metadata: &Value,
    ) -> Result<i64, StoreError> {
        let chunk_count = chunk_document(content).len() as i64;
        let mut collections = self.collections.write().unwrap();
        collections.entry(collection.to_string()).or_default().insert(
            key.to_string(),
            StoredDocument {
                content: content.to_string(),
                metadata: metadata.clone(),
                chunk_count,
            },
        );
        Ok(chunk_count)
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_and_delete_round_trip() {
        let store = MemoryVectorStore::new();
        let chunks = store
            .upsert("features", "docs/features/a.feature", "Feature: a", &json!({}))
            .await
            .unwrap();
        assert_eq!(chunks, 1);
        assert!(store.contains("features", "docs/features/a.feature"));

        store
            .delete("features", "docs/features/a.feature")
            .await
            .unwrap();
        assert!(!store.contains("features", "docs/features/a.feature"));
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let store = MemoryVectorStore::new();
        assert!(store.delete("features", "nope").await.is_ok());
    }

    #[tokio::test]
    async fn upsert_replaces_existing() {
        let store = MemoryVectorStore::new();
        store
            .upsert("features", "k", "v1", &json!({}))
            .await
            .unwrap();
        store
            .upsert("features", "k", "v2", &json!({}))
            .await
            .unwrap();
        assert_eq!(store.document_count("features"), 1);
        assert_eq!(store.get("features", "k").unwrap().content, "v2");
    }
}
