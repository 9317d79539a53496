pub mod breaker;
pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitState, ProviderHealth};
pub use error::{ProviderError, ProviderErrorKind};
pub use factory::{build_chain, build_provider, chain_from_env, ProviderKind};
pub use orchestrator::{AttemptRecord, GenerationOutcome, ResilienceOrchestrator};
pub use provider::{
    GenerationParams, GenerationProvider, GenerationRequest, GenerationResponse, Message,
    MessageRole, ProviderCapabilities,
};
pub use retry::{BackoffStrategy, RetryPolicy};
