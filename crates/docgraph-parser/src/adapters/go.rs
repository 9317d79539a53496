use super::{leading_line_comment, module_name_from_path};
use async_trait::async_trait;
use docgraph_core::{content_hash, Language, ModuleInfo, ParserAdapter, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^package\s+(\w+)").unwrap());
static SINGLE_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^import\s+(?:\w+\s+)?"([^"]+)""#).unwrap());
static IMPORT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)import\s*\(([^)]*)\)").unwrap());
static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static FUNC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s+)?(\w+)").unwrap());
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^type\s+(\w+)\s+(?:struct|interface)\b").unwrap());

pub struct GoAdapter;

#[async_trait]
impl ParserAdapter for GoAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo> {
        let mut imports: Vec<String> = SINGLE_IMPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        for block in IMPORT_BLOCK_RE.captures_iter(content) {
            imports.extend(QUOTED_RE.captures_iter(&block[1]).map(|c| c[1].to_string()));
        }
        imports.dedup();

        // Go exports are the capitalized top-level names.
        let mut exports: Vec<String> = Vec::new();
        for caps in FUNC_RE.captures_iter(content).chain(TYPE_RE.captures_iter(content)) {
            let name = &caps[1];
            if name.chars().next().is_some_and(|c| c.is_uppercase()) {
                exports.push(name.to_string());
            }
        }

        let module_name = PACKAGE_RE
            .captures(content)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| module_name_from_path(path, &[]));

        Ok(ModuleInfo {
            path: path.to_path_buf(),
            module_name,
            language: Language::Go,
            imports,
            exports,
            function_count: FUNC_RE.captures_iter(content).count(),
            class_count: TYPE_RE.captures_iter(content).count(),
            line_count: content.lines().count(),
            doc_comment: leading_line_comment(content, "//"),
            content_hash: content_hash(content.as_bytes()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_package_imports_and_exported_names() {
        let source = r#"// Package store persists build artifacts.
package store

import (
    "fmt"
    "os"

    "example.com/project/internal/index"
)

type Store struct{}

type shard struct{}

func NewStore() *Store { return &Store{} }

func (s *Store) Get(key string) string { return "" }

func helper() {}
"#;
        let info = GoAdapter
            .parse(Path::new("internal/store/store.go"), source)
            .await
            .unwrap();

        assert_eq!(info.module_name, "store");
        assert_eq!(
            info.imports,
            vec!["fmt", "os", "example.com/project/internal/index"]
        );
        assert_eq!(info.exports, vec!["NewStore", "Get", "Store"]);
        assert_eq!(info.function_count, 3);
        assert_eq!(info.class_count, 2);
        assert_eq!(
            info.doc_comment.as_deref(),
            Some("Package store persists build artifacts.")
        );
    }
}
