use crate::{complexity_score, find_cycles, ModuleGraph};
use docgraph_cache::ParseCache;
use docgraph_core::{
    module_id_for, DocGraphError, GraphSettings, ModuleId, ParseFailure, ParserAdapter, Result,
};
use docgraph_parser::LanguageRegistry;
use ignore::{overrides::OverrideBuilder, WalkBuilder};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Directories that are never source modules.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/target/**",
    "**/.git/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/__pycache__/**",
    "**/.docgraph/**",
];

/// Aggregate numbers for one graph build.
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub total_files: usize,
    pub total_lines: usize,
    pub language_counts: BTreeMap<String, usize>,
    pub max_complexity: f64,
    pub average_complexity: f64,
}

/// Result of one project scan: the fully constructed graph plus
/// everything a caller needs to report on it. Parse failures are listed
/// here instead of aborting the build.
#[derive(Debug)]
pub struct GraphBuildReport {
    pub graph: ModuleGraph,
    pub parse_errors: Vec<ParseFailure>,
    /// Cycles as canonical node sequences; a one-element sequence is a
    /// self-import.
    pub cycles: Vec<Vec<ModuleId>>,
    /// Modules with no in-project dependents that are not entry points.
    /// Advisory only.
    pub unused_modules: Vec<ModuleId>,
    /// Imports that did not resolve to a project-local module, per
    /// importing module. These are external dependencies, outside cycle
    /// analysis.
    pub external_imports: BTreeMap<ModuleId, Vec<String>>,
    pub stats: GraphStats,
}

/// Builds the module dependency graph for a project root: enumerates
/// candidate files, routes each to its parser adapter through the parse
/// cache, resolves declared imports to in-project modules and analyzes
/// the result (cycles, complexity, unused modules).
pub struct ModuleGraphBuilder {
    registry: Arc<LanguageRegistry>,
    cache: Arc<ParseCache>,
    settings: GraphSettings,
    parse_concurrency: usize,
}

impl ModuleGraphBuilder {
    pub fn new(
        registry: Arc<LanguageRegistry>,
        cache: Arc<ParseCache>,
        settings: GraphSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            settings,
            parse_concurrency: num_cpus::get(),
        }
    }

    /// Bound the parse-phase worker pool.
    pub fn with_parse_concurrency(mut self, limit: usize) -> Self {
        self.parse_concurrency = limit.max(1);
        self
    }

    pub async fn build(
        &self,
        project_root: &Path,
        extra_excludes: &[String],
    ) -> Result<GraphBuildReport> {
        if tokio::fs::metadata(project_root).await.is_err() {
            return Err(DocGraphError::UnreadableRoot(project_root.to_path_buf()));
        }

        let files = self.collect_files(project_root, extra_excludes)?;
        info!("scanning {} candidate files", files.len());

        let semaphore = Arc::new(Semaphore::new(self.parse_concurrency));
        let mut tasks: JoinSet<(ModuleId, PathBuf, Result<docgraph_core::ModuleInfo>)> =
            JoinSet::new();

        for (abs_path, rel_path, adapter) in files {
            // Submission blocks on the pool, not just execution.
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("parse semaphore never closed");
            let cache = self.cache.clone();
            let id = module_id_for(&rel_path);
            tasks.spawn(async move {
                let _permit = permit;
                let parsed = cache.get_or_parse(&abs_path, adapter.as_ref()).await;
                (id, abs_path, parsed)
            });
        }

        let mut graph = ModuleGraph::new();
        let mut parse_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (id, abs_path, parsed) =
                joined.map_err(|e| DocGraphError::Graph(format!("parse task panicked: {e}")))?;
            match parsed {
                Ok(mut info) => {
                    // Store the project-relative path on the node.
                    info.path = PathBuf::from(&id);
                    graph.add_node(id, info);
                }
                Err(e) => {
                    warn!("excluding {} from graph: {}", abs_path.display(), e);
                    parse_errors.push(ParseFailure {
                        path: PathBuf::from(&id),
                        message: e.to_string(),
                    });
                }
            }
        }

        let (mut cycles, external_imports) = self.wire_edges(&mut graph);
        graph.finalize();
        cycles.extend(find_cycles(&graph));
        cycles.sort();
        cycles.dedup();

        for id in graph.node_ids() {
            let degree = graph.degree(&id);
            if let Some(node) = graph.node_mut(&id) {
                node.complexity =
                    complexity_score(&node.info, degree, &self.settings.complexity);
            }
        }

        let unused_modules = self.find_unused(&graph);
        let stats = self.stats_for(&graph, parse_errors.len());

        if !cycles.is_empty() {
            info!("found {} dependency cycles", cycles.len());
        }

        Ok(GraphBuildReport {
            graph,
            parse_errors,
            cycles,
            unused_modules,
            external_imports,
            stats,
        })
    }

    /// Enumerate candidate files, each paired with its parser adapter.
    /// Extensionless files are sniffed by content (shebang line) before
    /// being dropped.
    fn collect_files(
        &self,
        root: &Path,
        extra_excludes: &[String],
    ) -> Result<Vec<(PathBuf, PathBuf, Arc<dyn ParserAdapter>)>> {
        let mut overrides = OverrideBuilder::new(root);
        for pattern in DEFAULT_EXCLUDES {
            let _ = overrides.add(&format!("!{pattern}"));
        }
        for pattern in self
            .settings
            .exclude_patterns
            .iter()
            .chain(extra_excludes.iter())
        {
            overrides
                .add(&format!("!{pattern}"))
                .map_err(|e| DocGraphError::Graph(format!("bad exclude pattern: {e}")))?;
            debug!("added exclude pattern: {}", pattern);
        }
        let overrides = overrides
            .build()
            .map_err(|e| DocGraphError::Graph(e.to_string()))?;

        let supported: HashSet<&str> = self.registry.supported_extensions().into_iter().collect();
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .overrides(overrides)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("walker error: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let adapter = match path.extension().and_then(|e| e.to_str()) {
                Some(ext) => {
                    if !supported.contains(ext) {
                        continue;
                    }
                    self.registry.route(path, "")
                }
                None => self.registry.route(path, &read_prefix(path)),
            };
            let Some(adapter) = adapter else {
                continue;
            };
            let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push((path.to_path_buf(), rel, adapter));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    /// Resolve each module's raw imports to in-project edges. Returns
    /// self-import cycles and the unresolved (external) imports.
    fn wire_edges(
        &self,
        graph: &mut ModuleGraph,
    ) -> (Vec<Vec<ModuleId>>, BTreeMap<ModuleId, Vec<String>>) {
        // module name -> sorted ids carrying that name
        let mut name_index: HashMap<String, Vec<ModuleId>> = HashMap::new();
        for node in graph.nodes() {
            name_index
                .entry(node.info.module_name.clone())
                .or_default()
                .push(node.id.clone());
        }
        for ids in name_index.values_mut() {
            ids.sort_unstable();
        }
        let known_ids: HashSet<ModuleId> = graph.node_ids().into_iter().collect();

        let mut self_cycles = Vec::new();
        let mut external: BTreeMap<ModuleId, Vec<String>> = BTreeMap::new();
        let modules: Vec<(ModuleId, Vec<String>)> = graph
            .nodes()
            .map(|n| (n.id.clone(), n.info.imports.clone()))
            .collect();

        for (id, imports) in modules {
            for raw in imports {
                match resolve_import(&raw, &id, &name_index, &known_ids) {
                    Some(target) if target == id => {
                        debug!("self-import in {}", id);
                        self_cycles.push(vec![id.clone()]);
                    }
                    Some(target) => {
                        graph.add_edge(&id, &target);
                    }
                    None => {
                        external.entry(id.clone()).or_default().push(raw);
                    }
                }
            }
        }
        (self_cycles, external)
    }

    fn find_unused(&self, graph: &ModuleGraph) -> Vec<ModuleId> {
        graph
            .node_ids()
            .into_iter()
            .filter(|id| {
                if !graph.dependents_of(id).is_empty() {
                    return false;
                }
                let name = graph
                    .node(id)
                    .map(|n| n.info.module_name.as_str())
                    .unwrap_or_default();
                !self
                    .settings
                    .entry_points
                    .iter()
                    .any(|ep| ep == id || ep == name)
            })
            .collect()
    }

    fn stats_for(&self, graph: &ModuleGraph, error_count: usize) -> GraphStats {
        let mut stats = GraphStats {
            total_files: graph.node_count() + error_count,
            ..Default::default()
        };
        let mut sum = 0.0;
        for node in graph.nodes() {
            stats.total_lines += node.info.line_count;
            *stats
                .language_counts
                .entry(node.info.language.to_string())
                .or_default() += 1;
            stats.max_complexity = stats.max_complexity.max(node.complexity);
            sum += node.complexity;
        }
        if graph.node_count() > 0 {
            stats.average_complexity =
                (sum / graph.node_count() as f64 * 100.0).round() / 100.0;
        }
        stats
    }
}

/// Map one raw import string to a project-local module id, if any.
///
/// Relative path imports (`./util`, `../core/mod`) resolve against the
/// importer's directory with the usual extension and index-file
/// candidates; everything else matches by module name, trying the whole
/// string first and its final path segment second. Unresolved imports
/// are external dependencies.
fn resolve_import(
    raw: &str,
    importer: &ModuleId,
    name_index: &HashMap<String, Vec<ModuleId>>,
    known_ids: &HashSet<ModuleId>,
) -> Option<ModuleId> {
    if raw.starts_with("./") || raw.starts_with("../") {
        let base = match importer.rfind('/') {
            Some(pos) => &importer[..pos],
            None => "",
        };
        let joined = normalize_relative(base, raw)?;
        const SUFFIXES: &[&str] = &[
            "", ".ts", ".tsx", ".js", ".jsx", "/index.ts", "/index.tsx", "/index.js", "/index.jsx",
        ];
        for suffix in SUFFIXES {
            let candidate = format!("{joined}{suffix}");
            if known_ids.contains(&candidate) {
                return Some(candidate);
            }
        }
        return None;
    }

    let trimmed = raw.trim_start_matches('.');
    if let Some(ids) = name_index.get(trimmed) {
        return ids.first().cloned();
    }
    let last = trimmed
        .rsplit(['.', '/'])
        .next()
        .map(|s| s.rsplit("::").next().unwrap_or(s))?;
    if last.is_empty() {
        return None;
    }
    name_index.get(last).and_then(|ids| ids.first().cloned())
}

/// Read the first bytes of a file for content sniffing. A shebang fits
/// comfortably; read errors just yield an empty prefix.
fn read_prefix(path: &Path) -> String {
    use std::io::Read;
    let mut buf = [0u8; 256];
    match std::fs::File::open(path).and_then(|mut f| f.read(&mut buf)) {
        Ok(n) => String::from_utf8_lossy(&buf[..n]).into_owned(),
        Err(_) => String::new(),
    }
}

/// Join a relative import onto a base directory, resolving `.` and
/// `..` components. Returns None when the path escapes the project.
fn normalize_relative(base: &str, raw: &str) -> Option<String> {
    let mut parts: Vec<&str> = if base.is_empty() {
        Vec::new()
    } else {
        base.split('/').collect()
    };
    for component in raw.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::CacheSettings;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn builder() -> ModuleGraphBuilder {
        ModuleGraphBuilder::new(
            Arc::new(LanguageRegistry::new()),
            Arc::new(ParseCache::new(&CacheSettings::default())),
            GraphSettings::default(),
        )
        .with_parse_concurrency(2)
    }

    #[tokio::test]
    async fn builds_edges_from_python_imports() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.py", "import parser\nimport renderer\n");
        write(dir.path(), "parser.py", "import renderer\n");
        write(dir.path(), "renderer.py", "import os\n");

        let report = builder().build(dir.path(), &[]).await.unwrap();

        assert_eq!(report.graph.node_count(), 3);
        assert_eq!(report.graph.edge_count(), 3);
        assert_eq!(
            report.graph.dependents_of("renderer.py"),
            ["app.py".to_string(), "parser.py".to_string()]
        );
        // `os` is not project-local.
        assert_eq!(report.external_imports["renderer.py"], vec!["os"]);
        assert!(report.cycles.is_empty());
    }

    #[tokio::test]
    async fn three_module_cycle_is_reported_with_no_valid_ordering() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "import b\n");
        write(dir.path(), "b.py", "import c\n");
        write(dir.path(), "c.py", "import a\n");

        let report = builder().build(dir.path(), &[]).await.unwrap();

        assert_eq!(
            report.cycles,
            vec![vec!["a.py".to_string(), "b.py".to_string(), "c.py".to_string()]]
        );
    }

    #[tokio::test]
    async fn unused_modules_are_advisory_and_respect_entry_points() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "import util\n");
        write(dir.path(), "util.py", "x = 1\n");
        write(dir.path(), "orphan.py", "x = 2\n");

        let mut settings = GraphSettings::default();
        settings.entry_points.push("main".to_string());
        let builder = ModuleGraphBuilder::new(
            Arc::new(LanguageRegistry::new()),
            Arc::new(ParseCache::new(&CacheSettings::default())),
            settings,
        );
        let report = builder.build(dir.path(), &[]).await.unwrap();

        assert_eq!(report.unused_modules, vec!["orphan.py".to_string()]);
        assert!(report.graph.contains("orphan.py"));
    }

    #[tokio::test]
    async fn exclude_patterns_prune_the_scan() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.py", "x = 1\n");
        write(dir.path(), "vendor/dep.py", "x = 2\n");

        let report = builder()
            .build(dir.path(), &["vendor/**".to_string()])
            .await
            .unwrap();

        assert!(report.graph.contains("app.py"));
        assert!(!report.graph.contains("vendor/dep.py"));
    }

    #[tokio::test]
    async fn relative_typescript_imports_resolve() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/app.ts",
            "import { x } from \"./util\";\nimport { y } from \"./widgets/index\";\n",
        );
        write(dir.path(), "src/util.ts", "export const x = 1;\n");
        write(dir.path(), "src/widgets/index.ts", "export const y = 2;\n");

        let report = builder().build(dir.path(), &[]).await.unwrap();

        assert_eq!(
            report.graph.dependencies_of("src/app.ts"),
            [
                "src/util.ts".to_string(),
                "src/widgets/index.ts".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn extensionless_scripts_are_sniffed_by_shebang() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "scripts/deploy",
            "#!/usr/bin/env python3\nimport app\n",
        );
        write(dir.path(), "app.py", "x = 1\n");
        write(dir.path(), "Makefile", "all:\n\ttrue\n");

        let report = builder().build(dir.path(), &[]).await.unwrap();

        assert!(report.graph.contains("scripts/deploy"));
        assert_eq!(
            report.graph.dependencies_of("scripts/deploy"),
            ["app.py".to_string()]
        );
        assert!(!report.graph.contains("Makefile"));
    }

    #[tokio::test]
    async fn single_worker_pool_builds_the_same_graph() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "import b\n");
        write(dir.path(), "b.py", "import c\n");
        write(dir.path(), "c.py", "x = 1\n");

        let report = builder()
            .with_parse_concurrency(1)
            .build(dir.path(), &[])
            .await
            .unwrap();

        assert_eq!(report.graph.node_count(), 3);
        assert_eq!(report.graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn unreadable_root_is_fatal() {
        let err = builder()
            .build(Path::new("/definitely/not/here"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DocGraphError::UnreadableRoot(_)));
    }

    #[test]
    fn relative_paths_normalize() {
        assert_eq!(
            normalize_relative("src/api", "../core/util").as_deref(),
            Some("src/core/util")
        );
        assert_eq!(normalize_relative("", "./a").as_deref(), Some("a"));
        assert_eq!(normalize_relative("a", "../../escape"), None);
    }
}
