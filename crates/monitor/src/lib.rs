//! Context monitor / analytics.
//!
//! Consumes `{operation, durationMs, success, contextId, sessionId}` events
//! and periodic memory samples, tracks per-operation EMA baselines, raises
//! deduplicated typed alerts when thresholds are crossed, and grades overall
//! health A-F.

pub mod alerts;
pub mod analytics;
pub mod baseline;

pub use alerts::{Alert, AlertDeduper, AlertSeverity, AlertType};
pub use analytics::{summarize, AnalyticsSummary, Grade};
pub use baseline::{Baseline, BaselineTracker};

use parking_lot::Mutex;

use sa_domain::config::MonitorConfig;
use sa_domain::trace::TraceEvent;

pub struct OperationSample<'a> {
    pub operation: &'a str,
    pub duration_ms: u64,
    pub success: bool,
    pub context_id: Option<String>,
    pub session_id: Option<String>,
}

pub struct MemorySample {
    pub resident_bytes: u64,
    pub growth_rate_bytes_per_min: f64,
}

pub struct Monitor {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

#[derive(Default)]
struct MonitorState {
    tracker: Option<BaselineTracker>,
    deduper: AlertDeduper,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MonitorState {
                tracker: Some(BaselineTracker::new(config.ema_alpha)),
                deduper: AlertDeduper::new(),
            }),
        }
    }

    /// Folds one operation observation into its baseline and raises an
    /// alert if the observed duration (for retrieval/enhancement) or
    /// the observed failure (for accuracy/error-rate) crosses threshold.
    pub fn record_operation(&self, sample: OperationSample<'_>) -> Option<Alert> {
        let mut state = self.state.lock();
        let tracker = state.tracker.get_or_insert_with(|| BaselineTracker::new(self.config.ema_alpha));
        tracker.observe(sample.operation, sample.duration_ms, sample.success);

        let alert_type = match sample.operation {
            "retrieval" if sample.duration_ms > self.config.retrieval_time_alert_ms => Some(AlertType::RetrievalTime),
            "enhancement" if sample.duration_ms > self.config.enhancement_time_alert_ms => Some(AlertType::EnhancementTime),
            _ if !sample.success => Some(AlertType::ErrorRateSpike),
            _ => None,
        };

        let alert_type = alert_type?;
        let threshold = match alert_type {
            AlertType::RetrievalTime => self.config.retrieval_time_alert_ms as f64,
            AlertType::EnhancementTime => self.config.enhancement_time_alert_ms as f64,
            _ => self.config.error_rate_alert_threshold,
        };
        let metric_value = if matches!(alert_type, AlertType::ErrorRateSpike) {
            1.0
        } else {
            sample.duration_ms as f64
        };

        let alert = Alert {
            alert_type,
            severity: AlertSeverity::Warning,
            context_id: sample.context_id.clone(),
            session_id: sample.session_id.clone(),
            metric_value,
            threshold,
        };

        let raised = state.deduper.raise(alert);
        drop(state);

        if let Some(ref alert) = raised {
            emit_alert(alert);
        }
        raised
    }

    /// Checks a memory sample for leak-shaped growth; independent of the
    /// per-operation baselines.
    pub fn record_memory_sample(&self, sample: MemorySample, context_id: Option<String>, session_id: Option<String>) -> Option<Alert> {
        if sample.growth_rate_bytes_per_min <= 0.0 {
            let mut state = self.state.lock();
            state.deduper.resolve(AlertType::MemoryLeak, &context_id, &session_id);
            return None;
        }
        const LEAK_GROWTH_THRESHOLD_BYTES_PER_MIN: f64 = 10.0 * 1024.0 * 1024.0;
        if sample.growth_rate_bytes_per_min <= LEAK_GROWTH_THRESHOLD_BYTES_PER_MIN {
            return None;
        }
        let alert = Alert {
            alert_type: AlertType::MemoryLeak,
            severity: AlertSeverity::Critical,
            context_id,
            session_id,
            metric_value: sample.growth_rate_bytes_per_min,
            threshold: LEAK_GROWTH_THRESHOLD_BYTES_PER_MIN,
        };
        let raised = self.state.lock().deduper.raise(alert);
        if let Some(ref alert) = raised {
            emit_alert(alert);
        }
        raised
    }

    pub fn resolve(&self, alert_type: AlertType, context_id: &Option<String>, session_id: &Option<String>) {
        self.state.lock().deduper.resolve(alert_type, context_id, session_id);
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        let state = self.state.lock();
        let tracker = state.tracker.as_ref();
        let retrieval = tracker.and_then(|t| t.get("retrieval"));
        let enhancement = tracker.and_then(|t| t.get("enhancement"));
        let accuracy = tracker.and_then(|t| t.get("accuracy"));
        summarize(retrieval, enhancement, accuracy, &self.config)
    }
}

fn emit_alert(alert: &Alert) {
    TraceEvent::MonitorAlert {
        alert_type: alert.alert_type.label().to_owned(),
        severity: format!("{:?}", alert.severity).to_lowercase(),
        context_id: alert.context_id.clone(),
        session_id: alert.session_id.clone(),
    }
    .emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_retrieval_raises_alert_once() {
        let monitor = Monitor::new(MonitorConfig::default());
        let sample = |duration_ms| OperationSample {
            operation: "retrieval",
            duration_ms,
            success: true,
            context_id: Some("c1".into()),
            session_id: Some("s1".into()),
        };
        assert!(monitor.record_operation(sample(500)).is_some());
        assert!(monitor.record_operation(sample(500)).is_none());
    }

    #[test]
    fn resolving_allows_alert_to_reappear() {
        let monitor = Monitor::new(MonitorConfig::default());
        let sample = OperationSample {
            operation: "retrieval",
            duration_ms: 500,
            success: true,
            context_id: Some("c1".into()),
            session_id: Some("s1".into()),
        };
        monitor.record_operation(sample);
        monitor.resolve(AlertType::RetrievalTime, &Some("c1".into()), &Some("s1".into()));
        let sample2 = OperationSample {
            operation: "retrieval",
            duration_ms: 500,
            success: true,
            context_id: Some("c1".into()),
            session_id: Some("s1".into()),
        };
        assert!(monitor.record_operation(sample2).is_some());
    }

    #[test]
    fn failed_operation_raises_error_rate_alert() {
        let monitor = Monitor::new(MonitorConfig::default());
        let sample = OperationSample {
            operation: "provider_call",
            duration_ms: 10,
            success: false,
            context_id: None,
            session_id: None,
        };
        let alert = monitor.record_operation(sample).unwrap();
        assert_eq!(alert.alert_type, AlertType::ErrorRateSpike);
    }

    #[test]
    fn memory_growth_above_threshold_alerts() {
        let monitor = Monitor::new(MonitorConfig::default());
        let alert = monitor.record_memory_sample(
            MemorySample {
                resident_bytes: 1 << 30,
                growth_rate_bytes_per_min: 50.0 * 1024.0 * 1024.0,
            },
            Some("c1".into()),
            Some("s1".into()),
        );
        assert!(alert.is_some());
    }

    #[test]
    fn shrinking_memory_does_not_alert() {
        let monitor = Monitor::new(MonitorConfig::default());
        let alert = monitor.record_memory_sample(
            MemorySample {
                resident_bytes: 1 << 30,
                growth_rate_bytes_per_min: -1.0,
            },
            None,
            None,
        );
        assert!(alert.is_none());
    }

    #[test]
    fn analytics_reflects_recorded_operations() {
        let monitor = Monitor::new(MonitorConfig::default());
        monitor.record_operation(OperationSample {
            operation: "retrieval",
            duration_ms: 50,
            success: true,
            context_id: None,
            session_id: None,
        });
        let summary = monitor.analytics();
        assert_eq!(summary.grade, Grade::A);
    }
}
