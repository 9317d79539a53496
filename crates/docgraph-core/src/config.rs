use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the DocGraph engine. Loading this from a
/// file is the caller's concern; the engine only consumes the struct.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocGraphConfig {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub graph: GraphSettings,

    #[serde(default)]
    pub resilience: ResilienceSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Parse-cache bounds and optional cross-run persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry-count ceiling; the least-recently-used entry is evicted
    /// first once exceeded.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Time-to-live in seconds; entries older than this are misses
    /// regardless of recency. None means entries never expire.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: Option<u64>,

    /// When set, the cache snapshot is loaded from and saved to this
    /// path so parse results survive across runs.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
            snapshot_path: None,
        }
    }
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_cache_ttl_secs() -> Option<u64> {
    Some(24 * 3600)
}

/// Weights for the module complexity score. The score must stay
/// monotone (more code or more connections never lowers it) and
/// non-negative, so all weights are expected to be >= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityWeights {
    #[serde(default = "default_line_weight")]
    pub line_weight: f64,
    #[serde(default = "default_function_weight")]
    pub function_weight: f64,
    #[serde(default = "default_class_weight")]
    pub class_weight: f64,
    #[serde(default = "default_import_weight")]
    pub import_weight: f64,
    #[serde(default = "default_export_weight")]
    pub export_weight: f64,
    /// Penalty per in-project dependency edge touching the module
    /// (fan-in plus fan-out).
    #[serde(default = "default_edge_penalty")]
    pub edge_penalty: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            line_weight: default_line_weight(),
            function_weight: default_function_weight(),
            class_weight: default_class_weight(),
            import_weight: default_import_weight(),
            export_weight: default_export_weight(),
            edge_penalty: default_edge_penalty(),
        }
    }
}

fn default_line_weight() -> f64 {
    0.1
}
fn default_function_weight() -> f64 {
    2.0
}
fn default_class_weight() -> f64 {
    3.0
}
fn default_import_weight() -> f64 {
    0.5
}
fn default_export_weight() -> f64 {
    0.3
}
fn default_edge_penalty() -> f64 {
    0.25
}

/// Graph construction settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphSettings {
    #[serde(default)]
    pub complexity: ComplexityWeights,

    /// Module ids treated as entry points; never flagged as unused.
    #[serde(default)]
    pub entry_points: Vec<String>,

    /// Extra exclude patterns on top of the built-in ones
    /// (target/, node_modules/, .git/, ...).
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Retry, circuit-breaker and timeout knobs for the provider layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceSettings {
    /// Maximum attempts per provider, including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling on any single inter-attempt delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff strategy: "fixed", "linear", "exponential" or
    /// "exponential-jitter".
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Consecutive failures before a provider's circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before permitting a trial call.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Bound on a single provider call, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            strategy: default_strategy(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_strategy() -> String {
    "exponential-jitter".to_string()
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_recovery_timeout_secs() -> u64 {
    60
}
fn default_attempt_timeout_secs() -> u64 {
    30
}

/// Run-level pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Parse-phase worker bound; 0 means one per CPU.
    #[serde(default)]
    pub parse_concurrency: usize,

    /// Generation-phase worker bound; 0 means four per CPU (calls spend
    /// most of their time waiting on the network).
    #[serde(default)]
    pub generation_concurrency: usize,

    /// Bound on total retry + fallback time for one module, in seconds.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Commit-message token that makes a run exit successfully without
    /// processing the revision.
    #[serde(default = "default_skip_token")]
    pub skip_token: String,

    /// Where the path-to-module-name map and last-processed revision
    /// marker are persisted.
    #[serde(default)]
    pub module_map_path: Option<PathBuf>,

    /// When true, dependents of a changed module are queued for
    /// regeneration instead of only being flagged stale-for-review.
    #[serde(default)]
    pub transitive: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            parse_concurrency: 0,
            generation_concurrency: 0,
            job_timeout_secs: default_job_timeout_secs(),
            skip_token: default_skip_token(),
            module_map_path: None,
            transitive: false,
        }
    }
}

fn default_job_timeout_secs() -> u64 {
    120
}

fn default_skip_token() -> String {
    "[skip docs]".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DocGraphConfig::default();
        assert_eq!(config.resilience.max_attempts, 3);
        assert_eq!(config.resilience.failure_threshold, 5);
        assert_eq!(config.cache.max_entries, 1000);
        assert!(!config.pipeline.transitive);
    }

    #[test]
    fn deserializes_from_partial_json() {
        let config: DocGraphConfig =
            serde_json::from_str(r#"{"resilience": {"max_attempts": 5}}"#).unwrap();
        assert_eq!(config.resilience.max_attempts, 5);
        assert_eq!(config.resilience.strategy, "exponential-jitter");
    }
}
