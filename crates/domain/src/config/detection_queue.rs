use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Detection job queue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionQueueConfig {
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on each subsequent attempt.
    #[serde(default = "d_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// How many terminal completed/failed jobs to retain for inspection.
    #[serde(default = "d_retain_count")]
    pub retain_completed: usize,
    #[serde(default = "d_retain_count")]
    pub retain_failed: usize,
    /// Worker pool size draining the queue. Clamped to `1..=20`.
    #[serde(default = "d_workers")]
    pub workers: usize,
}

impl Default for DetectionQueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: d_max_attempts(),
            initial_backoff_ms: d_initial_backoff_ms(),
            retain_completed: d_retain_count(),
            retain_failed: d_retain_count(),
            workers: d_workers(),
        }
    }
}

impl DetectionQueueConfig {
    pub fn clamped(&self) -> Self {
        Self {
            workers: self.workers.clamp(1, 20),
            ..*self
        }
    }
}

fn d_max_attempts() -> u32 {
    3
}
fn d_initial_backoff_ms() -> u64 {
    2_000
}
fn d_retain_count() -> usize {
    50
}
fn d_workers() -> usize {
    4
}
