use super::{leading_block_comment, leading_line_comment, module_name_from_path};
use async_trait::async_trait;
use docgraph_core::{content_hash, Language, ModuleInfo, ParserAdapter, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:[^'"]+\s+from\s+)?['"]([^'"]+)['"]"#).unwrap()
});
static REQUIRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static REEXPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*export\s+(?:default\s+)?(?:abstract\s+)?(?:async\s+)?(?:function|class|interface|type|enum|const|let|var)\s+(\w+)",
    )
    .unwrap()
});
static FUNCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\bfunction\s+(\w+)").unwrap());
static ARROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:export\s+)?const\s+\w+\s*=\s*(?:async\s+)?\(").unwrap());
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:export\s+)?(?:abstract\s+)?(?:class|interface|enum)\s+(\w+)").unwrap());

/// Shared extractor for TypeScript and JavaScript; the two dialects
/// only differ in which `Language` tag the produced record carries.
pub struct TypeScriptAdapter {
    language: Language,
}

impl TypeScriptAdapter {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

#[async_trait]
impl ParserAdapter for TypeScriptAdapter {
    fn language(&self) -> Language {
        self.language
    }

    async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo> {
        let mut imports: Vec<String> = IMPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        imports.extend(REQUIRE_RE.captures_iter(content).map(|c| c[1].to_string()));
        imports.extend(REEXPORT_RE.captures_iter(content).map(|c| c[1].to_string()));
        imports.dedup();

        let exports: Vec<String> = EXPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();

        let doc_comment = leading_block_comment(content, "/**", "*/")
            .or_else(|| leading_line_comment(content, "//"));

        Ok(ModuleInfo {
            path: path.to_path_buf(),
            module_name: module_name_from_path(path, &["index"]),
            language: self.language,
            imports,
            exports,
            function_count: FUNCTION_RE.captures_iter(content).count()
                + ARROW_RE.captures_iter(content).count(),
            class_count: TYPE_RE.captures_iter(content).count(),
            line_count: content.lines().count(),
            doc_comment,
            content_hash: content_hash(content.as_bytes()),
        })
    }
}
