use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Circuit breaker states. Transitions are driven lazily by the clock
/// at acquisition time; there is no background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Tripped: requests are short-circuited without being sent.
    Open,
    /// One trial request is allowed through to probe recovery.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Snapshot of one provider's breaker for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    pub short_circuits: u64,
    pub secs_since_last_failure: Option<u64>,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    /// Set while the single half-open trial is in flight.
    probe_in_flight: bool,
    total_successes: u64,
    total_failures: u64,
    short_circuits: u64,
}

/// Per-provider circuit breaker. Opens after `failure_threshold`
/// consecutive failures; after `recovery_timeout` the next acquisition
/// becomes the half-open trial. The trial's outcome either closes the
/// circuit or re-opens it for another full timeout.
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                last_failure_at: None,
                probe_in_flight: false,
                total_successes: 0,
                total_failures: 0,
                short_circuits: 0,
            }),
        }
    }

    /// Ask permission to send one request. Returns false when the
    /// circuit is open (or the half-open trial is already taken), in
    /// which case the caller must not consume retry budget.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.recovery_timeout {
                    info!("circuit for {} half-open, sending trial request", self.name);
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    true
                } else {
                    inner.short_circuits += 1;
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    inner.short_circuits += 1;
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!("circuit for {} closed after successful trial", self.name);
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
        inner.total_successes += 1;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.total_failures += 1;
        inner.last_failure_at = Some(Instant::now());
        inner.probe_in_flight = false;
        match inner.state {
            CircuitState::HalfOpen => {
                warn!("circuit for {} re-opened: trial request failed", self.name);
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    warn!(
                        "circuit for {} opened after {} consecutive failures",
                        self.name, inner.consecutive_failures
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            // A failure recorded while already open (e.g. a request that
            // was in flight when the circuit tripped) keeps it open.
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn health(&self) -> ProviderHealth {
        let inner = self.inner.lock();
        ProviderHealth {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            short_circuits: inner.short_circuits,
            secs_since_last_failure: inner.last_failure_at.map(|at| at.elapsed().as_secs()),
        }
    }
}
