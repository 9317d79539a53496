use super::module_name_from_path;
use async_trait::async_trait;
use docgraph_core::{content_hash, Language, ModuleInfo, ParserAdapter, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static USE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub\s+)?use\s+([\w:]+)").unwrap());
static MOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub\s+)?mod\s+(\w+)\s*;").unwrap());
static FN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)\bfn\s+(\w+)").unwrap());
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub(?:\([\w\s:]*\))?\s+)?(?:struct|enum|trait|union)\s+(\w+)").unwrap());
static PUB_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*pub(?:\([\w\s:]*\))?\s+(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|enum|trait|type|const|static|mod)\s+(\w+)")
        .unwrap()
});

pub struct RustAdapter;

#[async_trait]
impl ParserAdapter for RustAdapter {
    fn language(&self) -> Language {
        Language::Rust
    }

    async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo> {
        let mut imports: Vec<String> = USE_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        imports.extend(MOD_RE.captures_iter(content).map(|c| c[1].to_string()));
        imports.dedup();

        let exports: Vec<String> = PUB_ITEM_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();

        // Inner doc comments (`//!`) describe the module itself.
        let doc_lines: Vec<String> = content
            .lines()
            .take_while(|l| l.trim_start().starts_with("//!"))
            .map(|l| l.trim_start().trim_start_matches("//!").trim().to_string())
            .collect();
        let doc_comment = if doc_lines.is_empty() {
            None
        } else {
            Some(doc_lines.join("\n"))
        };

        Ok(ModuleInfo {
            path: path.to_path_buf(),
            module_name: module_name_from_path(path, &["mod", "lib", "main"]),
            language: Language::Rust,
            imports,
            exports,
            function_count: FN_RE.captures_iter(content).count(),
            class_count: TYPE_RE.captures_iter(content).count(),
            line_count: content.lines().count(),
            doc_comment,
            content_hash: content_hash(content.as_bytes()),
        })
    }
}
