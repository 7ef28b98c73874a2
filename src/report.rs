//! Run report: outcome counts plus a human-auditable per-file list.
//!
//! Built incrementally by the executor; purely a read-side view for the
//! caller. The CLI maps [`IndexReport::is_success`] to the process exit
//! code.

use std::fmt::Write as _;

/// Final disposition of one document within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Inserted,
    Updated,
    Deleted,
    Skipped,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: String,
    pub collection: Option<String>,
    pub kind: OutcomeKind,
    /// Skip or failure reason ("unmapped", "unreadable: …", store error).
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
    pub outcomes: Vec<FileOutcome>,
    /// True when an interactive run was declined before any mutation.
    pub aborted: bool,
    pub dry_run: bool,
}

impl IndexReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn push(&mut self, outcome: FileOutcome) {
        match outcome.kind {
            OutcomeKind::Inserted => self.inserted += 1,
            OutcomeKind::Updated => self.updated += 1,
            OutcomeKind::Deleted => self.deleted += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// A run succeeds when nothing failed. Skips and unchanged documents
    /// are normal.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Render the summary table plus itemized skips/failures. Verbose mode
    /// itemizes every outcome.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        let title = if self.dry_run {
            "specdex reindex report (dry-run)"
        } else if self.aborted {
            "specdex reindex aborted"
        } else {
            "specdex reindex report"
        };
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "=".repeat(title.len()));

        if self.aborted {
            let _ = writeln!(out, "  no changes applied");
            return out;
        }

        let _ = writeln!(out, "  inserted:   {}", self.inserted);
        let _ = writeln!(out, "  updated:    {}", self.updated);
        let _ = writeln!(out, "  deleted:    {}", self.deleted);
        let _ = writeln!(out, "  unchanged:  {}", self.unchanged);
        let _ = writeln!(out, "  skipped:    {}", self.skipped);
        let _ = writeln!(out, "  failed:     {}", self.failed);

        let itemize = |out: &mut String, kind: OutcomeKind, heading: &str| {
            let entries: Vec<&FileOutcome> =
                self.outcomes.iter().filter(|o| o.kind == kind).collect();
            if entries.is_empty() {
                return;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "  {}:", heading);
            for entry in entries {
                match &entry.reason {
                    Some(reason) => {
                        let _ = writeln!(out, "    {}  ({})", entry.path, reason);
                    }
                    None => {
                        let _ = writeln!(out, "    {}", entry.path);
                    }
                }
            }
        };

        // Failures and skips are always itemized; the rest only in verbose.
        itemize(&mut out, OutcomeKind::Failed, "failed");
        itemize(&mut out, OutcomeKind::Skipped, "skipped");
        if verbose {
            for (kind, heading) in [
                (OutcomeKind::Inserted, "inserted"),
                (OutcomeKind::Updated, "updated"),
                (OutcomeKind::Deleted, "deleted"),
            ] {
                itemize(&mut out, kind, heading);
            }
        }

        out
    }
}

impl FileOutcome {
    pub fn new(path: impl Into<String>, kind: OutcomeKind) -> Self {
        Self {
            path: path.into(),
            collection: None,
            kind,
            reason: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
