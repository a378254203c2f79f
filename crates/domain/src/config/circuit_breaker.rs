use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Circuit breaker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-provider circuit breaker parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before CLOSED → OPEN.
    #[serde(default = "d_failure_threshold")]
    pub failure_threshold: u32,
    /// Per-call operation timeout; exceeding it counts as a failure.
    #[serde(default = "d_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Time OPEN must elapse before the next call is admitted as a probe.
    #[serde(default = "d_recovery_time_ms")]
    pub recovery_time_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: d_failure_threshold(),
            operation_timeout_ms: d_operation_timeout_ms(),
            recovery_time_ms: d_recovery_time_ms(),
        }
    }
}

fn d_failure_threshold() -> u32 {
    5
}
fn d_operation_timeout_ms() -> u64 {
    30_000
}
fn d_recovery_time_ms() -> u64 {
    60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CircuitBreakerConfig::default();
        assert_eq!(cfg.failure_threshold, 5);
        assert_eq!(cfg.recovery_time_ms, 60_000);
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let cfg: CircuitBreakerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.operation_timeout_ms, 30_000);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = CircuitBreakerConfig {
            failure_threshold: 3,
            operation_timeout_ms: 5_000,
            recovery_time_ms: 10_000,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CircuitBreakerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.failure_threshold, 3);
    }
}
