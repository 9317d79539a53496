use docgraph_core::{JobReason, ModuleId, ParseFailure};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Pipeline phases, in order. `Failed` is terminal and only reached
/// from hard errors (no providers, unreadable root); per-job failures
/// leave the run in `Done` with the failures listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Scanning,
    GraphBuilt,
    JobsResolved,
    Generating,
    #[default]
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Scanning => "scanning",
            RunState::GraphBuilt => "graph-built",
            RunState::JobsResolved => "jobs-resolved",
            RunState::Generating => "generating",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Documentation produced for one module.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDoc {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub reason: JobReason,
}

/// Everything that happened in one run. Partial success is always
/// visible: failed and cancelled jobs are listed, never dropped.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    pub updated: Vec<ModuleId>,
    pub failed: Vec<(ModuleId, String)>,
    pub cancelled: Vec<ModuleId>,
    /// Set when the run was a deliberate no-op (skip marker, nothing
    /// changed since the last processed revision).
    pub skipped_reason: Option<String>,
    pub stale_for_review: Vec<ModuleId>,
    pub cycles: Vec<Vec<ModuleId>>,
    pub parse_errors: Vec<ParseFailure>,
    /// Generated documentation keyed by module; rendering and commit
    /// are the caller's concern.
    pub generated: BTreeMap<ModuleId, GeneratedDoc>,
}

impl RunSummary {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }
}
