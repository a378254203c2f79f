/// Shared error type used across the orchestrator crates.
///
/// Variants double as the error *taxonomy* consulted by the orchestrator
/// facade's fallback-walking logic: `RateLimit`, `Timeout`, `Analysis`, and
/// `CircuitOpen` are fallback-eligible; `Configuration` and
/// `ValidationFailure` are not (see `Error::is_fallback_eligible`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    /// Missing/invalid provider configuration or auth. Fatal for the
    /// affected provider; excluded from fallback eligibility.
    #[error("configuration: {0}")]
    Configuration(String),

    /// Provider or internal limiter refused the call.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    /// Provider returned unusable content, a server error, or a network
    /// error. Counted as a circuit-breaker failure.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// The circuit breaker for this provider is OPEN; the call was not
    /// attempted.
    #[error("circuit open for provider {provider}")]
    CircuitOpen { provider: String },

    /// Input exceeded a declared capability limit. Not retried.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the orchestrator facade should walk the fallback chain on
    /// this error, per the propagation policy in the error handling design.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            Error::RateLimit { .. }
                | Error::Timeout(_)
                | Error::Analysis(_)
                | Error::CircuitOpen { .. }
                | Error::Http(_)
        )
    }

    /// Whether a provider instance should count this as a circuit-breaker
    /// failure. `CircuitOpen` itself is explicitly excluded — a fail-fast
    /// short-circuit is not a new failure.
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Analysis(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_fallback_eligible() {
        assert!(Error::RateLimit { retry_after_secs: 5 }.is_fallback_eligible());
    }

    #[test]
    fn configuration_is_not_fallback_eligible() {
        assert!(!Error::Configuration("bad key".into()).is_fallback_eligible());
    }

    #[test]
    fn validation_failure_is_not_fallback_eligible() {
        assert!(!Error::ValidationFailure("empty image".into()).is_fallback_eligible());
    }

    #[test]
    fn circuit_open_does_not_count_as_breaker_failure() {
        assert!(!Error::CircuitOpen { provider: "p1".into() }.counts_as_breaker_failure());
    }

    #[test]
    fn analysis_counts_as_breaker_failure() {
        assert!(Error::Analysis("5xx".into()).counts_as_breaker_failure());
    }
}
