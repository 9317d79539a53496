use super::{leading_block_comment, module_name_from_path};
use async_trait::async_trait;
use docgraph_core::{content_hash, Language, ModuleInfo, ParserAdapter, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w\.]+)\s*;").unwrap());
static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(public\s+)?(?:final\s+|abstract\s+)*(?:class|interface|enum|record)\s+(\w+)")
        .unwrap()
});
static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:public|protected|private)\s+(?:static\s+|final\s+|synchronized\s+|abstract\s+)*[\w<>\[\],\s]+\s+(\w+)\s*\([^;{]*\)\s*(?:throws [\w\s,\.]+)?\s*\{",
    )
    .unwrap()
});

pub struct JavaAdapter;

#[async_trait]
impl ParserAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo> {
        let imports: Vec<String> = IMPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();

        // Public top-level types are the module's exports.
        let exports: Vec<String> = TYPE_RE
            .captures_iter(content)
            .filter(|c| c.get(1).is_some())
            .map(|c| c[2].to_string())
            .collect();

        Ok(ModuleInfo {
            path: path.to_path_buf(),
            module_name: module_name_from_path(path, &[]),
            language: Language::Java,
            imports,
            exports,
            function_count: METHOD_RE.captures_iter(content).count(),
            class_count: TYPE_RE.captures_iter(content).count(),
            line_count: content.lines().count(),
            doc_comment: leading_block_comment(content, "/**", "*/"),
            content_hash: content_hash(content.as_bytes()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_imports_types_and_methods() {
        let source = r#"/**
 * Order processing service.
 */
package com.example.orders;

import java.util.List;
import com.example.billing.Invoice;

public class OrderService {
    private final List<Invoice> invoices;

    public void process(String id) {
    }

    private int count() {
        return 0;
    }
}

class Helper {
}
"#;
        let info = JavaAdapter
            .parse(Path::new("src/main/java/OrderService.java"), source)
            .await
            .unwrap();

        assert_eq!(info.module_name, "OrderService");
        assert_eq!(info.imports, vec!["java.util.List", "com.example.billing.Invoice"]);
        assert_eq!(info.exports, vec!["OrderService"]);
        assert_eq!(info.class_count, 2);
        assert_eq!(info.function_count, 2);
        assert_eq!(info.doc_comment.as_deref(), Some("Order processing service."));
    }
}
