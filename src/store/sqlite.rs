//! SQLite-backed [`VectorStore`](super::VectorStore): the local default
//! backend.
//!
//! Documents and their paragraph chunks live in two tables keyed by
//! (collection, key); replacing a document is a single transaction. A
//! `collections` registry table records the known collection names so
//! `init` has something to verify against.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use super::{chunk_document, VectorStore};
use crate::error::{Result, StoreError};

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (creating if missing) the store database and ensure the schema.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, key)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                UNIQUE (collection, key, chunk_index)
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(collection, key)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Register collection names. Idempotent.
    pub async fn ensure_collections(&self, names: &[String]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        for name in names {
            sqlx::query(
                "INSERT INTO collections (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
            )
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Registered collection names, for verification.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    pub async fn document_count(&self, collection: &str) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Classify a sqlx failure: lock contention and pool exhaustion are worth
/// retrying, anything else is permanent.
fn map_sqlx(e: sqlx::Error) -> StoreError {
    let transient = matches!(e, sqlx::Error::PoolTimedOut)
        || e.as_database_error()
            .map(|db| db.message().contains("locked") || db.message().contains("busy"))
            .unwrap_or(false);
    if transient {
        StoreError::Transient(e.to_string())
    } else {
        StoreError::Permanent(e.to_string())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        content: &str,
        metadata: &Value,
    ) -> std::result::Result<i64, StoreError> {
        let chunks = chunk_document(content);
        let now = chrono::Utc::now().timestamp();
        let metadata_json =
            serde_json::to_string(metadata).map_err(|e| StoreError::Permanent(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, content, metadata_json, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, key) DO UPDATE SET
                content = excluded.content,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(content)
        .bind(&metadata_json)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("DELETE FROM chunks WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        for (index, text) in chunks.iter().enumerate() {
            sqlx::query(
                "INSERT INTO chunks (id, collection, key, chunk_index, text) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(collection)
            .bind(key)
            .bind(index as i64)
            .bind(text)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(chunks.len() as i64)
    }

    async fn delete(&self, collection: &str, key: &str) -> std::result::Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query("DELETE FROM chunks WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        sqlx::query("DELETE FROM documents WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }
}
