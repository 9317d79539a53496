pub mod pipeline;
mod prompt;
pub mod summary;

pub use pipeline::{IncrementalUpdatePipeline, RunContext};
pub use summary::{GeneratedDoc, RunState, RunSummary};
