use crate::GraphBuildReport;
use chrono::{DateTime, Utc};
use docgraph_core::{ModuleId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

const MODULE_MAP_VERSION: u32 = 1;

/// Persisted summary of the last successful run: which modules existed
/// and what their content looked like. Lets the next run decide whether
/// anything actually changed without rebuilding documentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMap {
    pub version: u32,
    /// Module id -> content hash at generation time. BTreeMap so the
    /// serialized artifact is stable across runs.
    pub modules: BTreeMap<ModuleId, String>,
    /// Source-control revision the map was generated at, when known.
    pub last_revision: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl ModuleMap {
    pub fn from_report(report: &GraphBuildReport, revision: Option<String>) -> Self {
        let modules = report
            .graph
            .nodes()
            .map(|n| (n.id.clone(), n.info.content_hash.clone()))
            .collect();
        Self {
            version: MODULE_MAP_VERSION,
            modules,
            last_revision: revision,
            generated_at: Utc::now(),
        }
    }

    /// Load a previously saved map. A missing file is a cold start, not
    /// an error; a corrupt or incompatible file is discarded with a
    /// warning so the run proceeds as if cold.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no module map at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Self>(&bytes) {
            Ok(map) if map.version == MODULE_MAP_VERSION => Ok(Some(map)),
            Ok(map) => {
                warn!(
                    "discarding module map with unsupported version {}",
                    map.version
                );
                Ok(None)
            }
            Err(e) => {
                warn!("discarding corrupt module map: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        debug!("wrote module map ({} modules)", self.modules.len());
        Ok(())
    }

    /// True when the current graph matches this map exactly (same
    /// modules, same content hashes) and the revision has not moved.
    pub fn is_current(&self, report: &GraphBuildReport, revision: Option<&str>) -> bool {
        if self.last_revision.as_deref() != revision {
            return false;
        }
        if self.modules.len() != report.graph.node_count() {
            return false;
        }
        report.graph.nodes().all(|n| {
            self.modules
                .get(&n.id)
                .is_some_and(|hash| *hash == n.info.content_hash)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_info;
    use crate::{GraphStats, ModuleGraph};
    use tempfile::TempDir;

    fn report_with_nodes(names: &[&str]) -> GraphBuildReport {
        let mut graph = ModuleGraph::new();
        for name in names {
            graph.add_node(name.to_string(), test_info(name));
        }
        graph.finalize();
        GraphBuildReport {
            graph,
            parse_errors: vec![],
            cycles: vec![],
            unused_modules: vec![],
            external_imports: BTreeMap::new(),
            stats: GraphStats::default(),
        }
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".docgraph").join("module_map.json");
        let report = report_with_nodes(&["a", "b"]);

        let map = ModuleMap::from_report(&report, Some("abc123".into()));
        map.save(&path).await.unwrap();

        let loaded = ModuleMap::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.modules, map.modules);
        assert_eq!(loaded.last_revision.as_deref(), Some("abc123"));
        assert!(loaded.is_current(&report, Some("abc123")));
    }

    #[tokio::test]
    async fn missing_map_is_a_cold_start() {
        let dir = TempDir::new().unwrap();
        let loaded = ModuleMap::load(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn corrupt_map_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(ModuleMap::load(&path).await.unwrap().is_none());
    }

    #[test]
    fn revision_or_content_drift_invalidates() {
        let report = report_with_nodes(&["a", "b"]);
        let map = ModuleMap::from_report(&report, Some("rev1".into()));

        assert!(!map.is_current(&report, Some("rev2")));
        assert!(!map.is_current(&report, None));

        let grown = report_with_nodes(&["a", "b", "c"]);
        assert!(!map.is_current(&grown, Some("rev1")));
    }
}
