//! The orchestrator's own external event surface, distinct from the
//! internal `TraceEvent` stream each subsystem emits for observability.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum OrchestratorEvent {
    DetectionStarted {
        document_id: String,
        session_id: String,
        job_ids: Vec<Uuid>,
        total_pages: u32,
        estimated_time_ms: u64,
    },
    DetectionProgress {
        job_id: Uuid,
        progress: u8,
        stage: String,
        current_symbol: Option<String>,
    },
    SymbolDetected {
        symbol: String,
        total_found: usize,
    },
    DetectionCompleted {
        job_id: Uuid,
        symbol_count: usize,
    },
    DetectionError {
        job_id: Uuid,
        error: String,
        details: Option<String>,
    },
    PerformanceWarning {
        operation: String,
        observed_ms: u64,
        threshold_ms: u64,
    },
    MemoryWarning {
        resident_bytes: u64,
        growth_rate_bytes_per_min: f64,
    },
    ContextAlert {
        alert_type: String,
        severity: String,
        context_id: Option<String>,
        session_id: Option<String>,
        metric_value: f64,
        threshold: f64,
    },
}
