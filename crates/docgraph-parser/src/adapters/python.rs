use super::{leading_block_comment, module_name_from_path};
use async_trait::async_trait;
use docgraph_core::{content_hash, Language, ModuleInfo, ParserAdapter, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+([\w\.]+)").unwrap());
static FROM_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*from\s+([\w\.]+)\s+import\s+").unwrap());
static DEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*def\s+(\w+)").unwrap());
static CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*class\s+(\w+)").unwrap());
static TOP_LEVEL_DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:def|class)\s+(\w+)").unwrap());

/// Regex-based Python module extractor. Mirrors the normalized output
/// of an AST-backed parser closely enough for dependency mapping:
/// import targets, top-level public names, and rough symbol counts.
pub struct PythonAdapter;

#[async_trait]
impl ParserAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo> {
        let mut imports: Vec<String> = IMPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        imports.extend(FROM_IMPORT_RE.captures_iter(content).map(|c| c[1].to_string()));
        imports.dedup();

        let exports: Vec<String> = TOP_LEVEL_DEF_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .filter(|name| !name.starts_with('_'))
            .collect();

        Ok(ModuleInfo {
            path: path.to_path_buf(),
            module_name: module_name_from_path(path, &["__init__"]),
            language: Language::Python,
            imports,
            exports,
            function_count: DEF_RE.captures_iter(content).count(),
            class_count: CLASS_RE.captures_iter(content).count(),
            line_count: content.lines().count(),
            doc_comment: leading_block_comment(content, "\"\"\"", "\"\"\""),
            content_hash: content_hash(content.as_bytes()),
        })
    }
}
