use crate::GraphBuildReport;
use docgraph_core::{module_id_for, JobReason, ModuleId, UpdateJob};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use tracing::debug;

/// How far a change propagates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeSetPolicy {
    /// When set, every transitive dependent of a changed module is
    /// queued as a job of its own instead of being flagged for review.
    pub transitive: bool,
}

/// The work derived from one set of changed files.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Jobs in processing order: ascending complexity, ties broken by
    /// module id.
    pub jobs: Vec<UpdateJob>,
    /// Direct dependents of changed modules that were not themselves
    /// changed. Their docs may describe a stale interface; they are
    /// flagged, not regenerated.
    pub stale_for_review: Vec<ModuleId>,
}

/// Turns "these files changed" into an ordered set of update jobs
/// against a built graph.
pub struct ChangeSetResolver {
    policy: ChangeSetPolicy,
}

impl ChangeSetResolver {
    pub fn new(policy: ChangeSetPolicy) -> Self {
        Self { policy }
    }

    pub fn resolve(&self, changed_paths: &[PathBuf], report: &GraphBuildReport) -> ChangeSet {
        let changed_ids: Vec<ModuleId> = changed_paths.iter().map(|p| module_id_for(p)).collect();
        let changed_set: HashSet<&str> = changed_ids.iter().map(String::as_str).collect();

        let mut jobs = Vec::new();
        let mut seen: HashSet<ModuleId> = HashSet::new();

        for id in &changed_ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = report.graph.node(id) {
                jobs.push(UpdateJob::new(
                    id.clone(),
                    JobReason::Changed,
                    node.complexity,
                ));
            } else if let Some(failure) = report.parse_errors.iter().find(|f| {
                module_id_for(&f.path) == *id
            }) {
                // The module no longer parses but its docs still need
                // to reflect that something changed.
                debug!("queueing unparseable module {}: {}", id, failure.message);
                jobs.push(UpdateJob::new(id.clone(), JobReason::ChangedUnparseable, 0.0));
            } else {
                debug!("ignoring changed path outside the graph: {}", id);
            }
        }

        let mut stale_for_review = Vec::new();
        if self.policy.transitive {
            for id in self.transitive_dependents(&changed_set, report) {
                if seen.insert(id.clone()) {
                    let complexity = report.graph.node(&id).map(|n| n.complexity).unwrap_or(0.0);
                    jobs.push(UpdateJob::new(id, JobReason::DependentOfChanged, complexity));
                }
            }
        } else {
            let mut flagged: HashSet<ModuleId> = HashSet::new();
            for id in &changed_ids {
                for dependent in report.graph.dependents_of(id) {
                    if !changed_set.contains(dependent.as_str()) {
                        flagged.insert(dependent.clone());
                    }
                }
            }
            stale_for_review = flagged.into_iter().collect();
            stale_for_review.sort_unstable();
        }

        // Cheapest first so early failures waste the least provider
        // budget; id tiebreak keeps the order stable.
        jobs.sort_by(|a, b| {
            a.complexity
                .partial_cmp(&b.complexity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.module.cmp(&b.module))
        });

        ChangeSet {
            jobs,
            stale_for_review,
        }
    }

    /// Reverse-reachability closure over the dependent relation,
    /// excluding the changed modules themselves.
    fn transitive_dependents(
        &self,
        changed: &HashSet<&str>,
        report: &GraphBuildReport,
    ) -> Vec<ModuleId> {
        let mut visited: HashSet<ModuleId> = HashSet::new();
        let mut queue: VecDeque<ModuleId> = changed.iter().map(|s| s.to_string()).collect();
        while let Some(id) = queue.pop_front() {
            for dependent in report.graph.dependents_of(&id) {
                if changed.contains(dependent.as_str()) {
                    continue;
                }
                if visited.insert(dependent.clone()) {
                    queue.push_back(dependent.clone());
                }
            }
        }
        let mut out: Vec<ModuleId> = visited.into_iter().collect();
        out.sort_unstable();
        out
    }
}
