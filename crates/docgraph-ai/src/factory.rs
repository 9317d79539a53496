use crate::provider::GenerationProvider;
use crate::providers::{AnthropicProvider, OllamaProvider, OpenAiProvider};
use docgraph_core::{DocGraphError, Result};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = DocGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(DocGraphError::Provider(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Build one provider from environment-based configuration.
pub fn build_provider(kind: ProviderKind) -> Result<Arc<dyn GenerationProvider>> {
    Ok(match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_env()?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_env()?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_env()?),
    })
}

/// Build the chain named in configuration, in order. Fails if any
/// named provider cannot be constructed.
pub fn build_chain(names: &[String]) -> Result<Vec<Arc<dyn GenerationProvider>>> {
    names
        .iter()
        .map(|name| build_provider(name.parse()?))
        .collect()
}

/// Auto-detect a chain from the environment: hosted providers whose
/// keys are present, then a local Ollama fallback. May be empty.
pub fn chain_from_env() -> Vec<Arc<dyn GenerationProvider>> {
    let mut chain: Vec<Arc<dyn GenerationProvider>> = Vec::new();
    for kind in [ProviderKind::Anthropic, ProviderKind::OpenAi] {
        match build_provider(kind) {
            Ok(provider) => {
                info!("using provider {}", provider.name());
                chain.push(provider);
            }
            Err(e) => debug!("skipping provider: {}", e),
        }
    }
    if std::env::var("OLLAMA_HOST").is_ok() {
        if let Ok(provider) = build_provider(ProviderKind::Ollama) {
            info!("using provider ollama");
            chain.push(provider);
        }
    }
    chain
}
