//! Exponential-moving-average performance baselines per operation.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct Baseline {
    pub mean_duration_ms: f64,
    pub success_rate: f64,
    pub samples: u64,
}

impl Baseline {
    fn new(duration_ms: u64, success: bool) -> Self {
        Self {
            mean_duration_ms: duration_ms as f64,
            success_rate: if success { 1.0 } else { 0.0 },
            samples: 1,
        }
    }

    fn update(&mut self, duration_ms: u64, success: bool, alpha: f64) {
        self.mean_duration_ms = alpha * duration_ms as f64 + (1.0 - alpha) * self.mean_duration_ms;
        let observed = if success { 1.0 } else { 0.0 };
        self.success_rate = alpha * observed + (1.0 - alpha) * self.success_rate;
        self.samples += 1;
    }
}

/// Tracks a running EMA baseline per operation name.
#[derive(Debug, Default)]
pub struct BaselineTracker {
    alpha: f64,
    baselines: HashMap<String, Baseline>,
}

impl BaselineTracker {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            baselines: HashMap::new(),
        }
    }

    /// Records one observation, returning the baseline *before* this sample
    /// was folded in (the caller compares against this to detect drift).
    pub fn observe(&mut self, operation: &str, duration_ms: u64, success: bool) -> Option<Baseline> {
        match self.baselines.get_mut(operation) {
            Some(existing) => {
                let prior = *existing;
                existing.update(duration_ms, success, self.alpha);
                Some(prior)
            }
            None => {
                self.baselines.insert(operation.to_owned(), Baseline::new(duration_ms, success));
                None
            }
        }
    }

    pub fn get(&self, operation: &str) -> Option<Baseline> {
        self.baselines.get(operation).copied()
    }
}
