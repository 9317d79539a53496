//! Run one incremental update against a local checkout.
//!
//! ```sh
//! ANTHROPIC_API_KEY=... cargo run -p docgraph-pipeline --example run_once -- \
//!     /path/to/project changed/file.py other/changed.ts
//! ```

use docgraph_core::DocGraphConfig;
use docgraph_pipeline::{IncrementalUpdatePipeline, RunContext};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let project_root = PathBuf::from(args.next().unwrap_or_else(|| ".".into()));
    let changed_paths: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let mut config = DocGraphConfig::default();
    config.pipeline.module_map_path = Some(project_root.join(".docgraph/module_map.json"));
    config.cache.snapshot_path = Some(project_root.join(".docgraph/cache.json"));

    let providers = docgraph_ai::chain_from_env();
    let pipeline = IncrementalUpdatePipeline::new(config, providers)?;

    let ctx = RunContext {
        project_root,
        changed_paths,
        commit_message: None,
        revision: None,
    };
    let summary = pipeline.run(&ctx, &CancellationToken::new()).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
