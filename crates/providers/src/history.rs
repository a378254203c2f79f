//! Bounded ring of recent call outcomes, kept per provider instance for
//! health checks and metrics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;

const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency_ms: u64,
}

/// Thread-safe fixed-capacity ring buffer of recent call outcomes.
pub struct RequestHistory {
    inner: Mutex<VecDeque<CallOutcome>>,
}

impl RequestHistory {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(MAX_ENTRIES)),
        }
    }

    pub fn record(&self, outcome: CallOutcome) {
        let mut buf = self.inner.lock();
        if buf.len() >= MAX_ENTRIES {
            buf.pop_front();
        }
        buf.push_back(outcome);
    }

    /// Most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<CallOutcome> {
        let buf = self.inner.lock();
        buf.iter().rev().take(limit).cloned().collect()
    }

    pub fn success_rate(&self) -> f64 {
        let buf = self.inner.lock();
        if buf.is_empty() {
            return 1.0;
        }
        let successes = buf.iter().filter(|o| o.success).count();
        successes as f64 / buf.len() as f64
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool) -> CallOutcome {
        CallOutcome {
            timestamp: Utc::now(),
            success,
            latency_ms: 10,
        }
    }

    #[test]
    fn ring_caps_at_max_entries() {
        let history = RequestHistory::new();
        for _ in 0..(MAX_ENTRIES + 10) {
            history.record(outcome(true));
        }
        assert_eq!(history.recent(MAX_ENTRIES + 10).len(), MAX_ENTRIES);
    }

    #[test]
    fn success_rate_with_mixed_outcomes() {
        let history = RequestHistory::new();
        history.record(outcome(true));
        history.record(outcome(true));
        history.record(outcome(false));
        history.record(outcome(true));
        assert_eq!(history.success_rate(), 0.75);
    }

    #[test]
    fn success_rate_empty_is_one() {
        let history = RequestHistory::new();
        assert_eq!(history.success_rate(), 1.0);
    }

    #[test]
    fn recent_returns_newest_first() {
        let history = RequestHistory::new();
        history.record(CallOutcome {
            timestamp: Utc::now(),
            success: true,
            latency_ms: 1,
        });
        history.record(CallOutcome {
            timestamp: Utc::now(),
            success: true,
            latency_ms: 2,
        });
        let recent = history.recent(1);
        assert_eq!(recent[0].latency_ms, 2);
    }
}
