use crate::breaker::{CircuitBreaker, ProviderHealth};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::provider::{GenerationProvider, GenerationRequest, GenerationResponse};
use crate::retry::RetryPolicy;
use dashmap::DashMap;
use docgraph_core::{DocGraphError, ResilienceSettings, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One failed attempt, kept for the run summary.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub provider: String,
    pub attempt: u32,
    pub error: String,
}

/// Terminal result of driving one request through the provider chain.
#[derive(Debug)]
pub enum GenerationOutcome {
    Succeeded {
        response: GenerationResponse,
        provider: String,
        attempts: Vec<AttemptRecord>,
    },
    /// Every provider exhausted its budget or failed terminally.
    Failed { attempts: Vec<AttemptRecord> },
    Cancelled,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Succeeded { .. })
    }
}

/// Drives requests through an ordered provider chain with per-provider
/// retry budgets and circuit breakers.
///
/// Retry rules: retryable failures (network, timeout, rate limit,
/// server) sleep per the backoff schedule and try the same provider
/// again; terminal failures (auth, quota, model) skip straight to the
/// next provider; an open circuit short-circuits a provider without
/// consuming any retry budget.
pub struct ResilienceOrchestrator {
    providers: Vec<Arc<dyn GenerationProvider>>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    error_counts: DashMap<ProviderErrorKind, u64>,
    policy: RetryPolicy,
    failure_threshold: u32,
    recovery_timeout: Duration,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for ResilienceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceOrchestrator")
            .field("providers", &self.providers.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResilienceOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn GenerationProvider>>,
        settings: &ResilienceSettings,
    ) -> Result<Self> {
        if providers.is_empty() {
            return Err(DocGraphError::NoProviders);
        }
        Ok(Self {
            providers,
            breakers: DashMap::new(),
            error_counts: DashMap::new(),
            policy: RetryPolicy::from_settings(settings),
            failure_threshold: settings.failure_threshold,
            recovery_timeout: Duration::from_secs(settings.recovery_timeout_secs),
            attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs),
        })
    }

    fn breaker_for(&self, provider: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(provider.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    provider,
                    self.failure_threshold,
                    self.recovery_timeout,
                ))
            })
            .clone()
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationOutcome {
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for provider in &self.providers {
            let name = provider.name().to_string();
            let breaker = self.breaker_for(&name);
            let mut attempt = 0u32;

            while attempt < self.policy.max_attempts {
                if cancel.is_cancelled() {
                    return GenerationOutcome::Cancelled;
                }
                if !breaker.try_acquire() {
                    debug!("circuit open for {}, trying next provider", name);
                    break;
                }
                attempt += 1;

                // In-flight calls are never aborted by cancellation;
                // the token is only consulted between attempts.
                let result =
                    tokio::time::timeout(self.attempt_timeout, provider.generate(request)).await;
                let error = match result {
                    Ok(Ok(response)) => {
                        breaker.record_success();
                        return GenerationOutcome::Succeeded {
                            response,
                            provider: name,
                            attempts,
                        };
                    }
                    Ok(Err(e)) => e,
                    Err(_) => ProviderError::timeout(&name, self.attempt_timeout.as_secs()),
                };

                breaker.record_failure();
                *self.error_counts.entry(error.kind).or_insert(0) += 1;
                warn!(
                    "attempt {}/{} against {} failed: {}",
                    attempt, self.policy.max_attempts, name, error
                );
                let retryable = error.is_retryable();
                attempts.push(AttemptRecord {
                    provider: name.clone(),
                    attempt,
                    error: error.to_string(),
                });
                if !retryable {
                    break;
                }
                if attempt < self.policy.max_attempts {
                    let delay = self.policy.delay_for(attempt);
                    tokio::select! {
                        _ = cancel.cancelled() => return GenerationOutcome::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        GenerationOutcome::Failed { attempts }
    }

    /// Failure counts by classification, across all providers.
    pub fn error_counts(&self) -> Vec<(ProviderErrorKind, u64)> {
        let mut counts: Vec<_> = self
            .error_counts
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        counts.sort_by_key(|(kind, _)| format!("{kind}"));
        counts
    }

    /// Breaker snapshots in chain order, for reporting.
    pub fn health(&self) -> Vec<(String, ProviderHealth)> {
        self.providers
            .iter()
            .map(|p| {
                let name = p.name().to_string();
                let health = self.breaker_for(&name).health();
                (name, health)
            })
            .collect()
    }
}
