use std::fmt;
use thiserror::Error;

/// Coarse classification of a provider failure. The orchestrator keys
/// its retry and failover decisions off this, never off message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Connection-level failure before a response arrived.
    Network,
    /// The request ran out of time.
    Timeout,
    /// HTTP 429.
    RateLimit,
    /// HTTP 401/403. Retrying the same credentials cannot help.
    Auth,
    /// HTTP 402 or an explicit quota/billing rejection.
    Quota,
    /// HTTP 5xx.
    Server,
    /// The requested model is unknown or rejected the request shape.
    Model,
    Unknown,
}

impl ProviderErrorKind {
    /// Whether retrying the same provider can plausibly succeed. Only
    /// transient transport and load conditions qualify; an unclassified
    /// failure escalates to the next provider instead of burning the
    /// retry budget on an unknown cause.
    pub fn is_retryable(self) -> bool {
        match self {
            ProviderErrorKind::Network
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::RateLimit
            | ProviderErrorKind::Server => true,
            ProviderErrorKind::Auth
            | ProviderErrorKind::Quota
            | ProviderErrorKind::Model
            | ProviderErrorKind::Unknown => false,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::Network => "network",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::RateLimit => "rate-limit",
            ProviderErrorKind::Auth => "auth",
            ProviderErrorKind::Quota => "quota",
            ProviderErrorKind::Server => "server",
            ProviderErrorKind::Model => "model",
            ProviderErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A classified failure from one generation attempt.
#[derive(Debug, Clone, Error)]
#[error("{kind} error from {provider}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Classify an HTTP error response. The body is only inspected to
    /// tell model-shape rejections apart from other 4xx failures.
    pub fn from_status(status: reqwest::StatusCode, provider: &str, body: &str) -> Self {
        let kind = match status.as_u16() {
            401 | 403 => ProviderErrorKind::Auth,
            402 => ProviderErrorKind::Quota,
            429 => ProviderErrorKind::RateLimit,
            500..=599 => ProviderErrorKind::Server,
            400 | 404 | 422 if body.to_lowercase().contains("model") => ProviderErrorKind::Model,
            _ => ProviderErrorKind::Unknown,
        };
        Self::new(kind, provider, format!("HTTP {}: {}", status, truncate(body)))
    }

    /// Classify a transport-level failure.
    pub fn from_transport(err: reqwest::Error, provider: &str) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_connect() || err.is_request() {
            ProviderErrorKind::Network
        } else {
            ProviderErrorKind::Unknown
        };
        Self::new(kind, provider, err.to_string())
    }

    pub fn timeout(provider: &str, secs: u64) -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            provider,
            format!("no response within {}s", secs),
        )
    }
}

fn truncate(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn statuses_map_onto_the_taxonomy() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ProviderErrorKind::Auth),
            (StatusCode::FORBIDDEN, ProviderErrorKind::Auth),
            (StatusCode::PAYMENT_REQUIRED, ProviderErrorKind::Quota),
            (StatusCode::TOO_MANY_REQUESTS, ProviderErrorKind::RateLimit),
            (StatusCode::INTERNAL_SERVER_ERROR, ProviderErrorKind::Server),
            (StatusCode::BAD_GATEWAY, ProviderErrorKind::Server),
        ];
        for (status, kind) in cases {
            assert_eq!(ProviderError::from_status(status, "p", "").kind, kind);
        }
    }

    #[test]
    fn unknown_model_is_not_retryable() {
        let err = ProviderError::from_status(
            StatusCode::NOT_FOUND,
            "p",
            "The model `gpt-nope` does not exist",
        );
        assert_eq!(err.kind, ProviderErrorKind::Model);
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_transient_kinds_are_retryable() {
        assert!(ProviderErrorKind::Network.is_retryable());
        assert!(ProviderErrorKind::Timeout.is_retryable());
        assert!(ProviderErrorKind::RateLimit.is_retryable());
        assert!(ProviderErrorKind::Server.is_retryable());

        assert!(!ProviderErrorKind::Auth.is_retryable());
        assert!(!ProviderErrorKind::Quota.is_retryable());
        assert!(!ProviderErrorKind::Model.is_retryable());
        assert!(!ProviderErrorKind::Unknown.is_retryable());
    }
}
