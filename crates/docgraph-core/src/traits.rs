use crate::{Language, ModuleInfo, Result};
use async_trait::async_trait;
use std::path::Path;

/// Per-language parsing collaborator. Implementations convert source
/// text into the normalized `ModuleInfo` record; an adapter may degrade
/// to a lower-fidelity strategy as long as it honors this contract.
#[async_trait]
pub trait ParserAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Parse `content` (already read from `path`) into a `ModuleInfo`.
    /// A failure is a per-file parse error; callers must not abort a
    /// whole scan because of it.
    async fn parse(&self, path: &Path, content: &str) -> Result<ModuleInfo>;
}
