use crate::adapters::{GoAdapter, JavaAdapter, PythonAdapter, RustAdapter, TypeScriptAdapter};
use docgraph_core::{Language, ParserAdapter};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Routes files to parser adapters by extension, falling back to
/// shebang sniffing for extensionless files.
pub struct LanguageRegistry {
    extensions: HashMap<&'static str, Language>,
    adapters: HashMap<Language, Arc<dyn ParserAdapter>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut extensions: HashMap<&'static str, Language> = HashMap::new();
        extensions.insert("rs", Language::Rust);
        extensions.insert("ts", Language::TypeScript);
        extensions.insert("tsx", Language::TypeScript);
        extensions.insert("js", Language::JavaScript);
        extensions.insert("jsx", Language::JavaScript);
        extensions.insert("py", Language::Python);
        extensions.insert("pyi", Language::Python);
        extensions.insert("go", Language::Go);
        extensions.insert("java", Language::Java);

        let mut adapters: HashMap<Language, Arc<dyn ParserAdapter>> = HashMap::new();
        adapters.insert(Language::Rust, Arc::new(RustAdapter));
        adapters.insert(
            Language::TypeScript,
            Arc::new(TypeScriptAdapter::new(Language::TypeScript)),
        );
        adapters.insert(
            Language::JavaScript,
            Arc::new(TypeScriptAdapter::new(Language::JavaScript)),
        );
        adapters.insert(Language::Python, Arc::new(PythonAdapter));
        adapters.insert(Language::Go, Arc::new(GoAdapter));
        adapters.insert(Language::Java, Arc::new(JavaAdapter));

        Self {
            extensions,
            adapters,
        }
    }

    /// Detect the language of a file from its extension, then from a
    /// shebang line when the extension is missing or unknown.
    pub fn detect_language(&self, path: &Path, content: &str) -> Option<Language> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if let Some(lang) = self.extensions.get(ext.to_lowercase().as_str()) {
                return Some(*lang);
            }
        }
        self.sniff_shebang(content)
    }

    fn sniff_shebang(&self, content: &str) -> Option<Language> {
        let first = content.lines().next()?;
        if !first.starts_with("#!") {
            return None;
        }
        let lowered = first.to_lowercase();
        let lang = if lowered.contains("python") {
            Some(Language::Python)
        } else if lowered.contains("node") {
            Some(Language::JavaScript)
        } else {
            None
        };
        if let Some(lang) = lang {
            debug!("detected {} via shebang", lang);
        }
        lang
    }

    pub fn adapter_for(&self, language: Language) -> Option<Arc<dyn ParserAdapter>> {
        self.adapters.get(&language).cloned()
    }

    /// Convenience: detect the language and return the matching adapter.
    pub fn route(&self, path: &Path, content: &str) -> Option<Arc<dyn ParserAdapter>> {
        self.detect_language(path, content)
            .and_then(|lang| self.adapter_for(lang))
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<_> = self.extensions.keys().copied().collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        let registry = LanguageRegistry::new();
        assert_eq!(
            registry.detect_language(Path::new("src/main.rs"), ""),
            Some(Language::Rust)
        );
        assert_eq!(
            registry.detect_language(Path::new("app/index.tsx"), ""),
            Some(Language::TypeScript)
        );
        assert_eq!(
            registry.detect_language(Path::new("pkg/util.go"), ""),
            Some(Language::Go)
        );
    }

    #[test]
    fn falls_back_to_shebang_for_extensionless_files() {
        let registry = LanguageRegistry::new();
        assert_eq!(
            registry.detect_language(Path::new("scripts/deploy"), "#!/usr/bin/env python3\n"),
            Some(Language::Python)
        );
        assert_eq!(
            registry.detect_language(Path::new("scripts/build"), "#!/usr/bin/env node\n"),
            Some(Language::JavaScript)
        );
        assert_eq!(registry.detect_language(Path::new("Makefile"), "all:\n"), None);
    }

    #[test]
    fn every_detected_language_has_an_adapter() {
        let registry = LanguageRegistry::new();
        for lang in [
            Language::Rust,
            Language::TypeScript,
            Language::JavaScript,
            Language::Python,
            Language::Go,
            Language::Java,
        ] {
            assert!(registry.adapter_for(lang).is_some(), "missing {lang}");
        }
    }
}
