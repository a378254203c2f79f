//! Per-provider circuit breaker state machine.
//!
//! Wraps every outbound call: CLOSED admits calls; OPEN fails fast; HALF_OPEN
//! admits exactly one probe. Mutations happen under a single lock so the
//! state machine is a single-writer hotspot, not a transactional log.

use parking_lot::Mutex;
use sa_domain::config::CircuitBreakerConfig;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use std::time::{Duration, Instant};

fn state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "CLOSED",
        CircuitState::Open => "OPEN",
        CircuitState::HalfOpen => "HALF_OPEN",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_time: Option<Instant>,
    last_success_time: Option<Instant>,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    /// Set while a HALF_OPEN probe call is in flight. Only one caller may
    /// flip this from `false` to `true`; every other caller admitted while
    /// it's `true` fails fast instead of running a second concurrent probe.
    half_open_probe_in_flight: bool,
}

/// A circuit breaker guarding one provider's outbound calls.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    operation_timeout: Duration,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure_time: None,
                last_success_time: None,
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
                half_open_probe_in_flight: false,
            }),
            failure_threshold: cfg.failure_threshold,
            operation_timeout: Duration::from_millis(cfg.operation_timeout_ms),
            recovery_time: Duration::from_millis(cfg.recovery_time_ms),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let inner = self.inner.lock();
        CircuitMetrics {
            total_requests: inner.total_requests,
            successful_requests: inner.successful_requests,
            failed_requests: inner.failed_requests,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
        }
    }

    /// Called immediately before an operation is attempted. Returns an error
    /// if the circuit is open and recovery hasn't elapsed; otherwise admits
    /// the call (possibly transitioning OPEN -> HALF_OPEN first). HALF_OPEN
    /// admits exactly one probe call — every other caller that arrives while
    /// a probe is in flight fails fast until that probe resolves.
    fn admit(&self, provider: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::Open {
            let elapsed = inner
                .last_failure_time
                .map(|t| t.elapsed())
                .unwrap_or(Duration::MAX);
            if elapsed >= self.recovery_time {
                inner.state = CircuitState::HalfOpen;
                inner.half_open_probe_in_flight = false;
                TraceEvent::CircuitStateChanged {
                    provider_id: provider.to_string(),
                    from: state_label(CircuitState::Open).into(),
                    to: state_label(CircuitState::HalfOpen).into(),
                    consecutive_failures: inner.consecutive_failures,
                }
                .emit();
            } else {
                return Err(Error::CircuitOpen {
                    provider: provider.to_string(),
                });
            }
        }

        if inner.state == CircuitState::HalfOpen {
            if inner.half_open_probe_in_flight {
                return Err(Error::CircuitOpen {
                    provider: provider.to_string(),
                });
            }
            inner.half_open_probe_in_flight = true;
        }

        inner.total_requests += 1;
        Ok(())
    }

    fn record_success(&self, provider: &str) {
        let mut inner = self.inner.lock();
        let from = inner.state;
        inner.successful_requests += 1;
        inner.consecutive_failures = 0;
        inner.consecutive_successes += 1;
        inner.last_success_time = Some(Instant::now());
        inner.state = CircuitState::Closed;
        inner.half_open_probe_in_flight = false;
        if from != CircuitState::Closed {
            TraceEvent::CircuitStateChanged {
                provider_id: provider.to_string(),
                from: state_label(from).into(),
                to: state_label(CircuitState::Closed).into(),
                consecutive_failures: 0,
            }
            .emit();
        }
    }

    fn record_failure(&self, provider: &str) {
        let mut inner = self.inner.lock();
        let from = inner.state;
        inner.failed_requests += 1;
        inner.consecutive_successes = 0;
        inner.consecutive_failures += 1;
        inner.last_failure_time = Some(Instant::now());
        if inner.state == CircuitState::HalfOpen || inner.consecutive_failures >= self.failure_threshold {
            inner.state = CircuitState::Open;
        }
        inner.half_open_probe_in_flight = false;
        if from != inner.state {
            TraceEvent::CircuitStateChanged {
                provider_id: provider.to_string(),
                from: state_label(from).into(),
                to: state_label(inner.state).into(),
                consecutive_failures: inner.consecutive_failures,
            }
            .emit();
        }
    }

    fn clear_probe_if_half_open(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_probe_in_flight = false;
        }
    }

    /// Run `op` under the breaker and its own operation timeout. The
    /// future is not polled at all if the circuit is open.
    pub async fn execute<F, Fut, T>(&self, provider: &str, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.admit(provider)?;

        let result = tokio::time::timeout(self.operation_timeout, op()).await;
        match result {
            Ok(Ok(value)) => {
                self.record_success(provider);
                Ok(value)
            }
            Ok(Err(e)) => {
                if e.counts_as_breaker_failure() {
                    self.record_failure(provider);
                } else {
                    // Doesn't count toward the failure tally, but still
                    // resolves the probe — otherwise a HALF_OPEN probe that
                    // errors with e.g. `Auth`/`Configuration` would leave
                    // `half_open_probe_in_flight` stuck, locking out every
                    // later call until the process restarts.
                    self.clear_probe_if_half_open();
                }
                Err(e)
            }
            Err(_) => {
                self.record_failure(provider);
                Err(Error::Timeout(format!(
                    "provider '{provider}' exceeded operation_timeout_ms"
                )))
            }
        }
    }

    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Open;
        inner.last_failure_time = Some(Instant::now());
        inner.half_open_probe_in_flight = false;
    }

    pub fn force_close(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.half_open_probe_in_flight = false;
    }

    pub fn force_half_open(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::HalfOpen;
        inner.half_open_probe_in_flight = false;
    }

    /// Reset the state machine and all counters to a fresh CLOSED circuit.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.last_failure_time = None;
        inner.last_success_time = None;
        inner.total_requests = 0;
        inner.successful_requests = 0;
        inner.failed_requests = 0;
        inner.half_open_probe_in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            operation_timeout_ms: 50,
            recovery_time_ms: 20,
        }
    }

    async fn ok() -> Result<u32> {
        Ok(42)
    }

    async fn fail() -> Result<u32> {
        Err(Error::Analysis("boom".into()))
    }

    #[tokio::test]
    async fn closed_admits_calls() {
        let cb = CircuitBreaker::new(cfg());
        assert_eq!(cb.execute("p", ok).await.unwrap(), 42);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(cfg());
        for _ in 0..3 {
            let _ = cb.execute("p", fail).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn open_fails_fast_without_invoking_operation() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_open();
        let err = cb.execute("p", ok).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn half_open_probe_success_closes_circuit() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_open();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cb.execute("p", ok).await.unwrap(), 42);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_half_open();
        let _ = cb.execute("p", fail).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let cb = CircuitBreaker::new(cfg());
        let slow = || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, Error>(1)
        };
        let err = cb.execute("p", slow).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(cb.metrics().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn circuit_open_error_does_not_recount_as_failure() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_open();
        let _ = cb.execute("p", ok).await;
        assert_eq!(cb.metrics().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn half_open_admits_exactly_one_concurrent_probe() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_half_open();
        assert!(cb.admit("p").is_ok());
        let err = cb.admit("p").unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn half_open_probe_with_non_counting_error_still_releases_flag() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_half_open();
        let auth_fail = || async { Err::<u32, Error>(Error::Auth("bad key".into())) };
        let err = cb.execute("p", auth_fail).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        // The non-counting error didn't flip the circuit, but the next
        // caller must still be admitted as a probe instead of being
        // locked out forever.
        assert!(cb.admit("p").is_ok());
    }

    #[tokio::test]
    async fn half_open_admits_next_probe_after_previous_resolves() {
        let cb = CircuitBreaker::new(cfg());
        cb.force_half_open();
        let _ = cb.execute("p", fail).await;
        assert_eq!(cb.state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cb.admit("p").is_ok());
    }

    #[tokio::test]
    async fn reset_clears_counters() {
        let cb = CircuitBreaker::new(cfg());
        for _ in 0..3 {
            let _ = cb.execute("p", fail).await;
        }
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().total_requests, 0);
    }
}
