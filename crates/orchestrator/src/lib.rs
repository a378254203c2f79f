//! Orchestrator facade: binds the provider registry, the
//! conversation context engine, and the detection job queue behind one
//! entry point, and implements the fallback-chain propagation policy.

pub mod detection;
pub mod events;

pub use events::OrchestratorEvent;

use std::sync::Arc;
use std::time::Instant;

use sa_context::ContextStore;
use sa_detection::DetectionQueue;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use sa_monitor::Monitor;
use sa_providers::{AnalysisRequest, AnalysisResponse, LlmProvider, ProviderRegistry};

/// Binds the three subsystems an analysis request touches. Construction is
/// the only place the registry is mutated; everything after startup is
/// read-only fan-out across the held `Arc`s.
pub struct Orchestrator {
    pub registry: Arc<ProviderRegistry>,
    pub context_store: Arc<ContextStore>,
    pub detection_queue: Arc<DetectionQueue>,
    pub monitor: Arc<Monitor>,
}

impl Orchestrator {
    pub fn new(
        registry: ProviderRegistry,
        context_store: ContextStore,
        detection_queue: DetectionQueue,
        monitor: Monitor,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            context_store: Arc::new(context_store),
            detection_queue: Arc::new(detection_queue),
            monitor: Arc::new(monitor),
        }
    }

    /// Runs `request` against `provider_id`; on a fallback-eligible error,
    /// walks that provider's configured fallback chain in priority order.
    /// Aborts immediately on `Configuration`/`ValidationFailure` — no
    /// fallback attempt is made for those. Returns the first success, or
    /// the last error seen if every provider in the chain fails.
    pub async fn analyze_with_fallback(&self, provider_id: &str, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let provider = self
            .registry
            .get(provider_id)
            .ok_or_else(|| Error::Configuration(format!("unknown provider {provider_id}")))?;

        let mut attempted = vec![provider_id.to_string()];
        let mut last_error = match self.call_one(provider_id, provider, request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if !last_error.is_fallback_eligible() {
            return Err(last_error);
        }

        for fallback in self.registry.fallback_chain(provider_id) {
            let fallback_id = fallback.provider_id().to_string();
            TraceEvent::ProviderFallback {
                from_provider: attempted.last().cloned().unwrap_or_default(),
                to_provider: fallback_id.clone(),
                reason: last_error.to_string(),
            }
            .emit();

            match self.call_one(&fallback_id, fallback, request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let eligible = e.is_fallback_eligible();
                    attempted.push(fallback_id);
                    last_error = e;
                    if !eligible {
                        break;
                    }
                }
            }
        }

        self.monitor.record_operation(sa_monitor::OperationSample {
            operation: "provider_call",
            duration_ms: 0,
            success: false,
            context_id: None,
            session_id: None,
        });

        Err(last_error)
    }

    /// Enqueues one detection job per page of `pages` and returns the
    /// `detectionStarted` event plus the assigned job ids.
    pub fn submit_document(
        &self,
        document_id: &str,
        session_id: &str,
        pages: Vec<Vec<u8>>,
        settings: sa_detection::JobSettings,
    ) -> (OrchestratorEvent, Vec<uuid::Uuid>) {
        detection::submit_document(&self.detection_queue, document_id, session_id, pages, settings)
    }

    /// Drains and runs one pending detection job, forwarding its events.
    pub async fn process_next_detection_job(
        &self,
        config: &sa_domain::config::DetectionPipelineConfig,
        pattern_matcher: impl Fn(&[u8]) -> Vec<sa_detection::Candidate>,
        classifier: impl Fn(&[u8]) -> Vec<sa_detection::Candidate>,
    ) -> Option<Vec<OrchestratorEvent>> {
        detection::process_next(&self.detection_queue, config, pattern_matcher, classifier).await
    }

    async fn call_one(&self, provider_id: &str, provider: Arc<dyn sa_providers::LlmProvider>, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let started = Instant::now();
        let result = provider.analyze(request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Err(Error::RateLimit { retry_after_secs }) = &result {
            TraceEvent::RateLimitRejected {
                provider_id: provider_id.to_string(),
                retry_after_secs: *retry_after_secs,
            }
            .emit();
        }

        TraceEvent::ProviderCall {
            provider_id: provider_id.to_string(),
            model: request_model(&result),
            duration_ms,
            success: result.is_ok(),
        }
        .emit();

        result
    }
}

fn request_model(result: &Result<AnalysisResponse>) -> String {
    match result {
        Ok(response) => response.model.clone(),
        Err(_) => "unknown".to_string(),
    }
}
