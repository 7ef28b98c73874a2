//! Plan execution against the vector store.
//!
//! Operations are applied per collection, in planned order, in batches of
//! `index.batch_size`. After each batch the fingerprint store commits the
//! changes for the operations that succeeded, so an interrupted or partially
//! failed run resumes from exactly where it stopped: already-applied work is
//! fingerprinted and planned away on the next run.
//!
//! Collections are independent by construction (no operation spans two), so
//! up to `index.max_concurrent_collections` of them run concurrently.
//! Transient store errors are retried with doubling backoff; a document that
//! still fails is reported and the run continues.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::config::IndexConfig;
use crate::error::{IndexError, Result, StoreError};
use crate::fingerprint::{FingerprintChange, FingerprintStore};
use crate::models::{FingerprintRecord, IndexOperation};
use crate::planner::{CollectionPlan, Plan};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::report::{FileOutcome, IndexReport, OutcomeKind};
use crate::store::VectorStore;

/// How a computed plan is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Normal,
    /// Report what would happen; touch nothing.
    DryRun,
    /// Show the plan and ask before applying.
    Interactive,
}

/// Confirmation hook for interactive runs. Swapped for a canned answer in
/// tests.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, summary: &str) -> bool;
}

/// Prints the plan summary and reads y/n from stdin.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, summary: &str) -> bool {
        println!("{}", summary);
        print!("Apply these operations? [y/N] ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Applies a [`Plan`] and produces an [`IndexReport`].
pub struct IndexExecutor {
    store: Arc<dyn VectorStore>,
    fingerprints: Arc<FingerprintStore>,
    config: IndexConfig,
    progress: Arc<dyn ProgressReporter>,
}

impl IndexExecutor {
    pub fn new(
        store: Arc<dyn VectorStore>,
        fingerprints: Arc<FingerprintStore>,
        config: IndexConfig,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            store,
            fingerprints,
            config,
            progress,
        }
    }

    pub async fn apply(
        &self,
        plan: Plan,
        mode: ApplyMode,
        prompt: &dyn ConfirmPrompt,
    ) -> Result<IndexReport> {
        let mut report = IndexReport::new(mode == ApplyMode::DryRun);
        report.unchanged = plan.unchanged;
        for skip in &plan.skipped {
            report.push(
                FileOutcome::new(&skip.path, OutcomeKind::Skipped).with_reason(&skip.reason),
            );
        }

        if mode == ApplyMode::DryRun {
            for cp in &plan.collections {
                for op in &cp.ops {
                    report.push(planned_outcome(op));
                }
            }
            return Ok(report);
        }

        if mode == ApplyMode::Interactive && !plan.is_empty() {
            if !prompt.confirm(&plan_summary(&plan)) {
                report.aborted = true;
                return Ok(report);
            }
        }

        let mut pending = plan.collections.into_iter();
        loop {
            let group: Vec<CollectionPlan> = pending
                .by_ref()
                .take(self.config.max_concurrent_collections)
                .collect();
            if group.is_empty() {
                break;
            }

            let mut tasks = Vec::with_capacity(group.len());
            for cp in group {
                let store = Arc::clone(&self.store);
                let fingerprints = Arc::clone(&self.fingerprints);
                let config = self.config.clone();
                let progress = Arc::clone(&self.progress);
                tasks.push(tokio::spawn(async move {
                    apply_collection(store, fingerprints, config, progress, cp).await
                }));
            }
            // Every worker in the group is awaited before any error
            // propagates, so no task keeps writing after apply returns.
            let mut results = Vec::with_capacity(tasks.len());
            for task in tasks {
                results.push(task.await.map_err(|e| IndexError::Task(e.to_string())));
            }
            let mut first_err = None;
            for result in results {
                match result.and_then(|inner| inner) {
                    Ok(outcomes) => {
                        for outcome in outcomes {
                            report.push(outcome);
                        }
                    }
                    Err(e) => {
                        if first_err.is_none() {
                            first_err = Some(e);
                        }
                    }
                }
            }
            if let Some(e) = first_err {
                return Err(e);
            }
        }

        Ok(report)
    }
}

async fn apply_collection(
    store: Arc<dyn VectorStore>,
    fingerprints: Arc<FingerprintStore>,
    config: IndexConfig,
    progress: Arc<dyn ProgressReporter>,
    cp: CollectionPlan,
) -> Result<Vec<FileOutcome>> {
    let total = cp.ops.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut done = 0usize;

    for batch in cp.ops.chunks(config.batch_size) {
        let mut changes = Vec::with_capacity(batch.len());
        for op in batch {
            match apply_op(store.as_ref(), &config, op).await {
                Ok(change) => {
                    changes.push(change);
                    outcomes.push(planned_outcome(op));
                }
                Err(e) => {
                    outcomes.push(
                        FileOutcome::new(op.path(), OutcomeKind::Failed)
                            .with_collection(op.collection())
                            .with_reason(e.to_string()),
                    );
                }
            }
        }
        // Only the operations that reached the store get fingerprinted.
        fingerprints.commit(&changes).await?;

        done += batch.len();
        progress.report(ProgressEvent::Applying {
            collection: cp.collection.clone(),
            done,
            total,
        });
    }

    Ok(outcomes)
}

/// Apply one operation, retrying transient store errors with doubling
/// backoff. Returns the fingerprint change to commit on success.
async fn apply_op(
    store: &dyn VectorStore,
    config: &IndexConfig,
    op: &IndexOperation,
) -> std::result::Result<FingerprintChange, StoreError> {
    let mut attempt = 0u32;
    loop {
        let result = match op {
            IndexOperation::Insert {
                doc,
                collection,
                hash,
            }
            | IndexOperation::Update {
                doc,
                collection,
                hash,
                ..
            } => {
                let content = String::from_utf8_lossy(&doc.content);
                let metadata = serde_json::json!({
                    "file_path": doc.rel_path,
                    "type": doc.doc_type.map(|t| t.to_string()),
                    "collection": collection,
                    "modified_at": doc.modified_at,
                });
                store
                    .upsert(collection, &doc.rel_path, &content, &metadata)
                    .await
                    .map(|chunk_count| {
                        FingerprintChange::Upsert(FingerprintRecord {
                            path: doc.rel_path.clone(),
                            hash: hash.clone(),
                            collection: collection.clone(),
                            indexed_at: chrono::Utc::now().timestamp(),
                            chunk_count,
                        })
                    })
            }
            IndexOperation::Delete { path, collection } => store
                .delete(collection, path)
                .await
                .map(|_| FingerprintChange::Tombstone(path.clone())),
        };

        match result {
            Ok(change) => return Ok(change),
            Err(StoreError::Transient(msg)) => {
                if attempt >= config.max_retries {
                    return Err(StoreError::Permanent(format!(
                        "retries exhausted after {} attempts: {}",
                        attempt + 1,
                        msg
                    )));
                }
                let backoff = config.retry_backoff_ms << attempt;
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn planned_outcome(op: &IndexOperation) -> FileOutcome {
    let kind = match op {
        IndexOperation::Insert { .. } => OutcomeKind::Inserted,
        IndexOperation::Update { .. } => OutcomeKind::Updated,
        IndexOperation::Delete { .. } => OutcomeKind::Deleted,
    };
    FileOutcome::new(op.path(), kind).with_collection(op.collection())
}

/// Human rendering of a plan for the interactive confirmation: counts plus
/// the first few affected paths.
pub fn plan_summary(plan: &Plan) -> String {
    const PREVIEW: usize = 10;

    let (inserts, updates, deletes) = plan.counts();
    let mut out = format!(
        "Planned operations: {} insert(s), {} update(s), {} delete(s)",
        inserts, updates, deletes
    );

    let mut listed = 0usize;
    for cp in &plan.collections {
        for op in &cp.ops {
            if listed == PREVIEW {
                out.push_str(&format!(
                    "\n  ... and {} more",
                    plan.op_count() - PREVIEW
                ));
                return out;
            }
            let verb = match op {
                IndexOperation::Insert { .. } => "insert",
                IndexOperation::Update { .. } => "update",
                IndexOperation::Delete { .. } => "delete",
            };
            out.push_str(&format!("\n  {} {} -> {}", verb, op.path(), cp.collection));
            listed += 1;
        }
    }
    out
}
