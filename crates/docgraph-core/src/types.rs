use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a module: the project-relative path in
/// normalized (forward-slash) form.
pub type ModuleId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rust" => Ok(Language::Rust),
            "typescript" => Ok(Language::TypeScript),
            "javascript" => Ok(Language::JavaScript),
            "python" => Ok(Language::Python),
            "go" => Ok(Language::Go),
            "java" => Ok(Language::Java),
            other => Err(format!("unknown language: {}", other)),
        }
    }
}

/// Normalized description of one parsed source file. Immutable once
/// produced; there is exactly one `ModuleInfo` per (path, content hash)
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub path: PathBuf,
    pub module_name: String,
    pub language: Language,
    /// Raw import strings as declared in the source; resolution to
    /// in-project modules happens during graph construction.
    pub imports: Vec<String>,
    /// Publicly visible symbols (exported functions, types, classes).
    pub exports: Vec<String>,
    pub function_count: usize,
    pub class_count: usize,
    pub line_count: usize,
    pub doc_comment: Option<String>,
    /// SHA-256 of the file bytes at parse time.
    pub content_hash: String,
}

/// A per-file parse failure. Collected during a scan instead of
/// aborting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Why a module was queued for regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobReason {
    /// The module's own file changed.
    Changed,
    /// The file changed but no longer parses; documentation should note
    /// the failure rather than silently skip the module.
    ChangedUnparseable,
    /// A module this one depends on changed (transitive mode only).
    DependentOfChanged,
}

impl fmt::Display for JobReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobReason::Changed => "changed",
            JobReason::ChangedUnparseable => "changed-unparseable",
            JobReason::DependentOfChanged => "dependent-of-changed",
        };
        write!(f, "{}", s)
    }
}

/// One module's regeneration task. Created by the change-set resolver,
/// consumed by the resilience orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateJob {
    pub id: Uuid,
    pub module: ModuleId,
    pub reason: JobReason,
    /// Complexity score of the module at resolution time; jobs are
    /// dispatched in ascending order of this value.
    pub complexity: f64,
}

impl UpdateJob {
    pub fn new(module: ModuleId, reason: JobReason, complexity: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            module,
            reason,
            complexity,
        }
    }
}

/// Normalize a path into module-id form (project-relative, forward
/// slashes).
pub fn module_id_for(path: &std::path::Path) -> ModuleId {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn language_round_trips_through_display() {
        for lang in [
            Language::Rust,
            Language::TypeScript,
            Language::Python,
            Language::Go,
            Language::Java,
            Language::JavaScript,
        ] {
            assert_eq!(lang.to_string().parse::<Language>().unwrap(), lang);
        }
    }

    #[test]
    fn module_ids_use_forward_slashes() {
        let id = module_id_for(Path::new("src").join("core").join("mod.py").as_path());
        assert_eq!(id, "src/core/mod.py");
    }
}
