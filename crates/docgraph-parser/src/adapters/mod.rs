mod go;
mod java;
mod python;
mod rust;
mod typescript;

pub use go::GoAdapter;
pub use java::JavaAdapter;
pub use python::PythonAdapter;
pub use rust::RustAdapter;
pub use typescript::TypeScriptAdapter;

use std::path::Path;

/// Derive a module name from the file stem, taking the parent directory
/// name for aggregator files (`__init__.py`, `mod.rs`, `index.ts`, ...).
pub(crate) fn module_name_from_path(path: &Path, aggregators: &[&str]) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    if aggregators.contains(&stem) {
        if let Some(parent) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            return parent.to_string();
        }
    }
    stem.to_string()
}

/// Collect a leading comment block made of lines starting with `prefix`
/// (e.g. `//` or `#`), stopping at the first non-comment line.
pub(crate) fn leading_line_comment(content: &str, prefix: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#!") {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            lines.push(rest.trim().to_string());
        } else if trimmed.is_empty() && lines.is_empty() {
            continue;
        } else {
            break;
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Extract a leading block comment delimited by `open`/`close`
/// (e.g. `/**`...`*/` or `"""`...`"""`).
pub(crate) fn leading_block_comment(content: &str, open: &str, close: &str) -> Option<String> {
    let trimmed = content.trim_start();
    let body = trimmed.strip_prefix(open)?;
    let end = body.find(close)?;
    let doc: String = body[..end]
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}
