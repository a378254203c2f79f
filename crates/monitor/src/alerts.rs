//! Typed alerts with duplicate suppression.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    RetrievalTime,
    EnhancementTime,
    AccuracyDrop,
    StorageLimitExceeded,
    MemoryLeak,
    CacheMissRateHigh,
    ErrorRateSpike,
}

impl AlertType {
    pub fn label(self) -> &'static str {
        match self {
            Self::RetrievalTime => "retrieval_time",
            Self::EnhancementTime => "enhancement_time",
            Self::AccuracyDrop => "accuracy_drop",
            Self::StorageLimitExceeded => "storage_limit_exceeded",
            Self::MemoryLeak => "memory_leak",
            Self::CacheMissRateHigh => "cache_miss_rate_high",
            Self::ErrorRateSpike => "error_rate_spike",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub context_id: Option<String>,
    pub session_id: Option<String>,
    pub metric_value: f64,
    pub threshold: f64,
}

/// Suppresses duplicate alerts keyed on `(type, contextId, sessionId)` until
/// the prior one resolves, i.e. an observation arrives back under threshold.
#[derive(Debug, Default)]
pub struct AlertDeduper {
    active: HashMap<(AlertType, Option<String>, Option<String>), ()>,
}

impl AlertDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(alert_type: AlertType, context_id: &Option<String>, session_id: &Option<String>) -> (AlertType, Option<String>, Option<String>) {
        (alert_type, context_id.clone(), session_id.clone())
    }

    /// Returns `Some(alert)` only the first time this key breaches; further
    /// breaches of the same key are suppressed until `resolve` is called.
    pub fn raise(&mut self, alert: Alert) -> Option<Alert> {
        let key = Self::key(alert.alert_type, &alert.context_id, &alert.session_id);
        if self.active.contains_key(&key) {
            None
        } else {
            self.active.insert(key, ());
            Some(alert)
        }
    }

    pub fn resolve(&mut self, alert_type: AlertType, context_id: &Option<String>, session_id: &Option<String>) {
        self.active.remove(&Self::key(alert_type, context_id, session_id));
    }
}
