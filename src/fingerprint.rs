//! Persisted content fingerprints: the record of what is currently indexed.
//!
//! The store is a single SQLite table keyed by path, living under the
//! project state directory. It is the only source of truth for planning;
//! the vector store is never queried to answer "what is indexed". Commits
//! are transactional so an interrupted run can never leave a half-applied
//! batch behind.

use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::models::FingerprintRecord;

/// Deterministic content hash over line-ending-normalized bytes.
///
/// CRLF sequences are folded to LF before hashing so the fingerprint is
/// stable across checkout line-ending settings; file metadata never
/// participates.
pub fn compute_fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_line_endings(content));
    format!("{:x}", hasher.finalize())
}

fn normalize_line_endings(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut i = 0;
    while i < content.len() {
        if content[i] == b'\r' && content.get(i + 1) == Some(&b'\n') {
            i += 1;
            continue;
        }
        out.push(content[i]);
        i += 1;
    }
    out
}

/// One entry in a commit batch: a new/updated record or a removal.
#[derive(Debug, Clone)]
pub enum FingerprintChange {
    Upsert(FingerprintRecord),
    Tombstone(String),
}

/// Per-collection aggregate for the `status` command.
pub struct CollectionStats {
    pub collection: String,
    pub doc_count: i64,
    pub chunk_count: i64,
    pub last_indexed: Option<i64>,
}

pub struct FingerprintStore {
    pool: SqlitePool,
}

impl FingerprintStore {
    /// Open (creating if missing) the fingerprint database at `db_path` and
    /// ensure the schema exists. An absent database means "nothing indexed
    /// yet", not corruption.
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
            CREATE TABLE IF NOT EXISTS fingerprints (
                path TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                collection TEXT NOT NULL,
                indexed_at INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_fingerprints_collection ON fingerprints(collection)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Load every record, keyed by path.
    pub async fn load(&self) -> Result<HashMap<String, FingerprintRecord>> {
        let rows = sqlx::query(
            "SELECT path, hash, collection, indexed_at, chunk_count FROM fingerprints",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let record = FingerprintRecord {
                path: row.get("path"),
                hash: row.get("hash"),
                collection: row.get("collection"),
                indexed_at: row.get("indexed_at"),
                chunk_count: row.get("chunk_count"),
            };
            map.insert(record.path.clone(), record);
        }
        Ok(map)
    }

    /// Atomically persist a batch of changes. Either every change in the
    /// batch is durably written or none are.
    pub async fn commit(&self, changes: &[FingerprintChange]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for change in changes {
            match change {
                FingerprintChange::Upsert(record) => {
                    sqlx::query(
                        r#"
                        INSERT INTO fingerprints (path, hash, collection, indexed_at, chunk_count)
                        VALUES (?, ?, ?, ?, ?)
                        ON CONFLICT(path) DO UPDATE SET
                            hash = excluded.hash,
                            collection = excluded.collection,
                            indexed_at = excluded.indexed_at,
                            chunk_count = excluded.chunk_count
                        "#,
                    )
                    .bind(&record.path)
                    .bind(&record.hash)
                    .bind(&record.collection)
                    .bind(record.indexed_at)
                    .bind(record.chunk_count)
                    .execute(&mut *tx)
                    .await?;
                }
                FingerprintChange::Tombstone(path) => {
                    sqlx::query("DELETE FROM fingerprints WHERE path = ?")
                        .bind(path)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Per-collection document/chunk counts and last-indexed timestamps.
    pub async fn stats(&self) -> Result<Vec<CollectionStats>> {
        let rows = sqlx::query(
            r#"
            SELECT
                collection,
                COUNT(*) AS doc_count,
                SUM(chunk_count) AS chunk_count,
                MAX(indexed_at) AS last_indexed
            FROM fingerprints
            GROUP BY collection
            ORDER BY collection
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CollectionStats {
                collection: row.get("collection"),
                doc_count: row.get("doc_count"),
                chunk_count: row.get::<Option<i64>, _>("chunk_count").unwrap_or(0),
                last_indexed: row.get("last_indexed"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
