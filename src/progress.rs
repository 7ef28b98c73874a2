//! Progress reporting to stderr.
//!
//! Reports are advisory: the pipeline emits events at phase boundaries and
//! after each applied batch, and reporters decide how (or whether) to show
//! them. Stdout stays reserved for the final report.

use std::io::Write;
use std::sync::Arc;

/// Pipeline milestones, in the order they occur.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Walking the document tree under `root`.
    Scanning { root: String },
    /// Diffing `documents` scanned files against stored fingerprints.
    Planning { documents: usize },
    /// `done` of `total` operations applied for `collection`.
    Applying {
        collection: String,
        done: usize,
        total: usize,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Line-per-event reporter for terminals.
pub struct HumanProgress;

impl ProgressReporter for HumanProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match event {
            ProgressEvent::Scanning { root } => format!("scanning {}", root),
            ProgressEvent::Planning { documents } => {
                format!("planning ({} documents)", documents)
            }
            ProgressEvent::Applying {
                collection,
                done,
                total,
            } => format!("applying {} [{}/{}]", collection, done, total),
        };
        let _ = writeln!(std::io::stderr(), "{}", line);
    }
}

/// One JSON object per line, for machine consumers.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let value = match event {
            ProgressEvent::Scanning { root } => {
                serde_json::json!({"event": "scanning", "root": root})
            }
            ProgressEvent::Planning { documents } => {
                serde_json::json!({"event": "planning", "documents": documents})
            }
            ProgressEvent::Applying {
                collection,
                done,
                total,
            } => serde_json::json!({
                "event": "applying",
                "collection": collection,
                "done": done,
                "total": total,
            }),
        };
        let _ = writeln!(std::io::stderr(), "{}", value);
    }
}

/// Discards everything.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a terminal, silent otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(self) -> Arc<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoProgress),
            ProgressMode::Human => Arc::new(HumanProgress),
            ProgressMode::Json => Arc::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "none" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}' (expected off, human, or json)",
                other
            )),
        }
    }
}
