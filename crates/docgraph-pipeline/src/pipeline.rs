use crate::prompt;
use crate::summary::{GeneratedDoc, RunState, RunSummary};
use docgraph_ai::{GenerationOutcome, GenerationProvider, ProviderHealth, ResilienceOrchestrator};
use docgraph_cache::{load_snapshot, save_snapshot, ParseCache};
use docgraph_core::{DocGraphConfig, Result, UpdateJob};
use docgraph_graph::{ChangeSetPolicy, ChangeSetResolver, ModuleGraphBuilder, ModuleMap};
use docgraph_parser::LanguageRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Inputs for one run, produced by the source-control integration.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub project_root: PathBuf,
    /// Files touched in the commit range, project-relative.
    pub changed_paths: Vec<PathBuf>,
    pub commit_message: Option<String>,
    /// Revision being processed, recorded in the module map.
    pub revision: Option<String>,
}

/// End-to-end incremental update: scan, graph, resolve, generate.
///
/// Owns the parse cache and the provider orchestrator so consecutive
/// runs share cache hits and breaker state.
pub struct IncrementalUpdatePipeline {
    config: DocGraphConfig,
    registry: Arc<LanguageRegistry>,
    cache: Arc<ParseCache>,
    providers: Vec<Arc<dyn GenerationProvider>>,
    orchestrator: Arc<ResilienceOrchestrator>,
}

impl std::fmt::Debug for IncrementalUpdatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalUpdatePipeline")
            .field("config", &self.config)
            .field("providers", &self.providers.len())
            .finish_non_exhaustive()
    }
}

impl IncrementalUpdatePipeline {
    /// Fails immediately when the provider chain is empty; a pipeline
    /// that cannot generate anything should not start scanning.
    pub fn new(
        config: DocGraphConfig,
        providers: Vec<Arc<dyn GenerationProvider>>,
    ) -> Result<Self> {
        let orchestrator = Arc::new(ResilienceOrchestrator::new(
            providers.clone(),
            &config.resilience,
        )?);
        let cache = Arc::new(ParseCache::new(&config.cache));
        Ok(Self {
            config,
            registry: Arc::new(LanguageRegistry::new()),
            cache,
            providers,
            orchestrator,
        })
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn provider_health(&self) -> Vec<(String, ProviderHealth)> {
        self.orchestrator.health()
    }

    pub async fn run(&self, ctx: &RunContext, cancel: &CancellationToken) -> Result<RunSummary> {
        match self.run_inner(ctx, cancel).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(state = %RunState::Failed, "pipeline run failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        if cancel.is_cancelled() {
            return Err(docgraph_core::DocGraphError::Cancelled);
        }

        let skip_token = &self.config.pipeline.skip_token;
        if let Some(message) = &ctx.commit_message {
            if !skip_token.is_empty() && message.contains(skip_token) {
                info!("commit message carries {:?}, skipping run", skip_token);
                return Ok(RunSummary::skipped(format!(
                    "commit message contains {skip_token:?}"
                )));
            }
        }

        debug!(state = %RunState::Scanning, "scanning {}", ctx.project_root.display());
        if let Some(path) = &self.config.cache.snapshot_path {
            match load_snapshot(&self.cache, path).await {
                Ok(n) if n > 0 => info!("restored {} cache entries", n),
                Ok(_) => {}
                Err(e) => warn!("cache snapshot load failed: {}", e),
            }
        }

        let builder = ModuleGraphBuilder::new(
            self.registry.clone(),
            self.cache.clone(),
            self.config.graph.clone(),
        )
        .with_parse_concurrency(self.parse_concurrency());
        let report = builder.build(&ctx.project_root, &[]).await?;
        debug!(
            state = %RunState::GraphBuilt,
            "{} modules, {} edges, {} parse errors",
            report.graph.node_count(),
            report.graph.edge_count(),
            report.parse_errors.len()
        );

        let prior_map = match &self.config.pipeline.module_map_path {
            Some(path) => ModuleMap::load(path).await?,
            None => None,
        };
        if ctx.changed_paths.is_empty() {
            let current = prior_map
                .as_ref()
                .is_some_and(|m| m.is_current(&report, ctx.revision.as_deref()));
            if current {
                info!("nothing changed since last processed revision");
                let mut summary =
                    RunSummary::skipped("no changes since last processed revision");
                summary.cycles = report.cycles;
                summary.parse_errors = report.parse_errors;
                return Ok(summary);
            }
        }

        let resolver = ChangeSetResolver::new(ChangeSetPolicy {
            transitive: self.config.pipeline.transitive,
        });
        let change_set = resolver.resolve(&ctx.changed_paths, &report);
        info!(
            state = %RunState::JobsResolved,
            "{} jobs, {} modules flagged stale",
            change_set.jobs.len(),
            change_set.stale_for_review.len()
        );

        let mut summary = RunSummary {
            state: RunState::Done,
            stale_for_review: change_set.stale_for_review,
            cycles: report.cycles.clone(),
            parse_errors: report.parse_errors.clone(),
            ..Default::default()
        };

        if !change_set.jobs.is_empty() {
            for provider in &self.providers {
                if !provider.is_available().await {
                    warn!("provider {} reports unavailable", provider.name());
                }
            }
            debug!(state = %RunState::Generating, "dispatching {} jobs", change_set.jobs.len());
            self.generate_all(change_set.jobs, &report, cancel, &mut summary)
                .await?;
        }

        if !cancel.is_cancelled() {
            if let Some(path) = &self.config.pipeline.module_map_path {
                ModuleMap::from_report(&report, ctx.revision.clone())
                    .save(path)
                    .await?;
            }
            if let Some(path) = &self.config.cache.snapshot_path {
                save_snapshot(&self.cache, path).await?;
            }
        }

        info!(
            state = %RunState::Done,
            "updated {}, failed {}, cancelled {}",
            summary.updated.len(),
            summary.failed.len(),
            summary.cancelled.len()
        );
        Ok(summary)
    }

    /// Run the generation phase. Submission follows the resolver's
    /// complexity ordering and blocks on the pool semaphore; completion
    /// order is whatever the network gives us.
    async fn generate_all(
        &self,
        jobs: Vec<UpdateJob>,
        report: &docgraph_graph::GraphBuildReport,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.generation_concurrency()));
        let job_timeout = Duration::from_secs(self.config.pipeline.job_timeout_secs);
        let mut tasks: JoinSet<(UpdateJob, Option<GenerationOutcome>)> = JoinSet::new();

        for job in jobs {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("generation semaphore never closed");
            let request = prompt::build_request(&job, report);
            let orchestrator = self.orchestrator.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome =
                    tokio::time::timeout(job_timeout, orchestrator.generate(&request, &cancel))
                        .await
                        .ok();
                (job, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (job, outcome) = joined.map_err(|e| {
                docgraph_core::DocGraphError::InvalidOperation(format!(
                    "generation task panicked: {e}"
                ))
            })?;
            match outcome {
                Some(GenerationOutcome::Succeeded {
                    response, provider, ..
                }) => {
                    summary.updated.push(job.module.clone());
                    summary.generated.insert(
                        job.module,
                        GeneratedDoc {
                            content: response.content,
                            provider,
                            model: response.model,
                            reason: job.reason,
                        },
                    );
                }
                Some(GenerationOutcome::Failed { attempts }) => {
                    let detail = attempts
                        .last()
                        .map(|a| a.error.clone())
                        .unwrap_or_else(|| "all providers exhausted".to_string());
                    warn!("generation failed for {}: {}", job.module, detail);
                    summary.failed.push((job.module, detail));
                }
                Some(GenerationOutcome::Cancelled) => summary.cancelled.push(job.module),
                None => {
                    let detail = format!(
                        "job exceeded {}s budget",
                        self.config.pipeline.job_timeout_secs
                    );
                    warn!("generation failed for {}: {}", job.module, detail);
                    summary.failed.push((job.module, detail));
                }
            }
        }

        summary.updated.sort_unstable();
        summary.failed.sort();
        summary.cancelled.sort_unstable();
        Ok(())
    }

    fn parse_concurrency(&self) -> usize {
        match self.config.pipeline.parse_concurrency {
            0 => num_cpus::get(),
            n => n,
        }
    }

    fn generation_concurrency(&self) -> usize {
        match self.config.pipeline.generation_concurrency {
            0 => num_cpus::get() * 4,
            n => n,
        }
    }
}
