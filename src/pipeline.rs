//! The reindex pipeline: scan, load fingerprints, plan, apply.
//!
//! This is the single entry point the CLI calls; each stage lives in its
//! own module and this one only wires them together.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::executor::{ApplyMode, ConfirmPrompt, IndexExecutor};
use crate::fingerprint::FingerprintStore;
use crate::planner;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::report::{FileOutcome, IndexReport, OutcomeKind};
use crate::resolver::CollectionResolver;
use crate::scanner::{self, ScanFilter};
use crate::store::VectorStore;

pub struct ReindexRequest {
    pub filter: ScanFilter,
    pub mode: ApplyMode,
    /// Reindex documents whose fingerprints are unchanged.
    pub full: bool,
}

/// Run one reindex: scan the tree under `root`, diff against the fingerprint
/// store, apply the resulting plan to `store`.
pub async fn run_reindex(
    root: &Path,
    config: &Config,
    store: Arc<dyn VectorStore>,
    fingerprints: Arc<FingerprintStore>,
    progress: Arc<dyn ProgressReporter>,
    prompt: &dyn ConfirmPrompt,
    request: ReindexRequest,
) -> Result<IndexReport> {
    let resolver = CollectionResolver::new(&config.collections)?;

    progress.report(ProgressEvent::Scanning {
        root: root.display().to_string(),
    });
    let scan = scanner::scan(root, &resolver, &request.filter)?;

    progress.report(ProgressEvent::Planning {
        documents: scan.documents.len(),
    });
    let known = fingerprints.load().await?;
    let plan = planner::plan(
        &scan.documents,
        &resolver,
        &known,
        &request.filter,
        request.full,
    );

    let executor = IndexExecutor::new(store, fingerprints, config.index.clone(), progress);
    let mut report = executor.apply(plan, request.mode, prompt).await?;

    // Scan-time warnings (missing explicit paths, unreadable files) join the
    // report as skips so the caller sees one consolidated outcome list.
    for warning in scan.warnings {
        report.push(
            FileOutcome::new(warning.path, OutcomeKind::Skipped).with_reason(warning.reason),
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryVectorStore;
    use tempfile::TempDir;

    struct Yes;

    impl ConfirmPrompt for Yes {
        fn confirm(&self, _summary: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn missing_explicit_path_is_reported_as_skip() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("docs/features")).unwrap();
        let config = Config {
            collections: crate::config::default_routes(),
            ..Config::default()
        };
        let fingerprints = Arc::new(
            FingerprintStore::open(&tmp.path().join("fp.sqlite"))
                .await
                .unwrap(),
        );

        let report = run_reindex(
            tmp.path(),
            &config,
            Arc::new(MemoryVectorStore::new()),
            fingerprints,
            crate::progress::ProgressMode::Off.reporter(),
            &Yes,
            ReindexRequest {
                filter: ScanFilter {
                    paths: vec!["docs/features/missing.feature".to_string()],
                    ..ScanFilter::default()
                },
                mode: ApplyMode::Normal,
                full: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert!(report.is_success());
        assert!(report
            .outcomes
            .iter()
            .any(|o| o.reason.as_deref() == Some("file not found")));
    }
}
