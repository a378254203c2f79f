use serde::Serialize;

/// Structured trace events emitted across the orchestrator crates. Never
/// carries secrets — only identifiers, counts, and durations.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ProviderRegistered {
        provider_id: String,
        provider_type: String,
    },
    ProviderInitFailed {
        provider_type: String,
        reason: String,
    },
    CircuitStateChanged {
        provider_id: String,
        from: String,
        to: String,
        consecutive_failures: u32,
    },
    RateLimitRejected {
        provider_id: String,
        retry_after_secs: u64,
    },
    ProviderCall {
        provider_id: String,
        model: String,
        duration_ms: u64,
        success: bool,
    },
    ProviderFallback {
        from_provider: String,
        to_provider: String,
        reason: String,
    },
    ContextCreated {
        context_id: String,
        session_id: String,
    },
    TurnAppended {
        context_id: String,
        turn_number: u32,
        follow_up_detected: bool,
    },
    ContextExpired {
        context_id: String,
        session_id: String,
    },
    ContextCompressed {
        context_id: String,
        compression_ratio: f64,
        original_turn_count: usize,
    },
    QueryEnhanced {
        context_id: String,
        confidence: f64,
        references_resolved: usize,
    },
    JobEnqueued {
        job_id: String,
        document_id: String,
        page_number: u32,
    },
    JobStalled {
        job_id: String,
        attempt: u32,
    },
    JobCompleted {
        job_id: String,
        duration_ms: u64,
    },
    JobFailed {
        job_id: String,
        attempts: u32,
        reason: String,
    },
    PipelineStage {
        job_id: String,
        stage: String,
        progress: u8,
    },
    MonitorAlert {
        alert_type: String,
        severity: String,
        context_id: Option<String>,
        session_id: Option<String>,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "orchestrator_event");
    }
}
