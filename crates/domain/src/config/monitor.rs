use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context monitor / analytics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Smoothing factor for the exponential moving average tracking
    /// per-operation performance baselines.
    #[serde(default = "d_ema_alpha")]
    pub ema_alpha: f64,
    #[serde(default = "d_retrieval_time_ms")]
    pub retrieval_time_alert_ms: u64,
    #[serde(default = "d_enhancement_time_ms")]
    pub enhancement_time_alert_ms: u64,
    /// Minimum drop (as a fraction) in rolling accuracy before alerting.
    #[serde(default = "d_accuracy_drop")]
    pub accuracy_drop_threshold: f64,
    #[serde(default = "d_error_rate")]
    pub error_rate_alert_threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ema_alpha: d_ema_alpha(),
            retrieval_time_alert_ms: d_retrieval_time_ms(),
            enhancement_time_alert_ms: d_enhancement_time_ms(),
            accuracy_drop_threshold: d_accuracy_drop(),
            error_rate_alert_threshold: d_error_rate(),
        }
    }
}

fn d_ema_alpha() -> f64 {
    0.1
}
fn d_retrieval_time_ms() -> u64 {
    200
}
fn d_enhancement_time_ms() -> u64 {
    500
}
fn d_accuracy_drop() -> f64 {
    0.15
}
fn d_error_rate() -> f64 {
    0.1
}
