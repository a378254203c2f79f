//! Document-level detection orchestration: fans a document's pages out to
//! the job queue, then drains them through the detection pipeline.

use std::time::Duration;

use uuid::Uuid;

use sa_detection::{Candidate, DetectionPipeline, DetectionQueue, DetectionResult, JobSettings};
use sa_domain::config::DetectionPipelineConfig;
use sa_domain::error::Error;

use crate::events::OrchestratorEvent;

/// Enqueues one job per page and returns the `detectionStarted` event plus
/// the assigned job ids, in page order.
pub fn submit_document(
    queue: &DetectionQueue,
    document_id: &str,
    session_id: &str,
    pages: Vec<Vec<u8>>,
    settings: JobSettings,
) -> (OrchestratorEvent, Vec<Uuid>) {
    let total_pages = pages.len() as u32;
    let estimated_time_ms = settings.processing_timeout_ms * total_pages as u64;
    let job_ids: Vec<Uuid> = pages
        .into_iter()
        .enumerate()
        .map(|(page_number, blob)| queue.enqueue(document_id, session_id, page_number as u32, blob, settings.clone()))
        .collect();

    (
        OrchestratorEvent::DetectionStarted {
            document_id: document_id.to_string(),
            session_id: session_id.to_string(),
            job_ids: job_ids.clone(),
            total_pages,
            estimated_time_ms,
        },
        job_ids,
    )
}

/// Drains one pending job through the pipeline and resolves it on the
/// queue, returning every external event the run produced in order.
/// `pattern_matcher`/`classifier` are the pluggable symbol-recognition
/// backends; a caller wires in real ones, tests wire in canned data.
///
/// The run happens on a blocking-pool thread so `job.settings.processing_timeout_ms`
/// can actually bound it: `tokio::time::timeout` races the blocking task
/// against a deadline instead of just wrapping already-synchronous work, the
/// same way the circuit breaker's `execute` races a provider call against
/// `operation_timeout`. A job that exceeds the deadline is recorded as a
/// failure with `Error::Timeout`; the abandoned blocking task is left to
/// finish on its own thread and its result is discarded.
pub async fn process_next(
    queue: &DetectionQueue,
    config: &DetectionPipelineConfig,
    pattern_matcher: impl Fn(&[u8]) -> Vec<Candidate> + Send + 'static,
    classifier: impl Fn(&[u8]) -> Vec<Candidate> + Send + 'static,
) -> Option<Vec<OrchestratorEvent>> {
    let job = queue.dequeue()?;
    let mut events = Vec::new();
    let mut found_so_far = 0usize;

    let deadline = Duration::from_millis(job.settings.processing_timeout_ms);
    let config = *config;
    let job_id = job.job_id;
    let page_number = job.page_number;
    let image_blob = job.image_blob.clone();
    let settings = job.settings.clone();

    let handle = tokio::task::spawn_blocking(move || {
        let mut stage_events = Vec::new();
        let result = DetectionPipeline::run(
            job_id,
            page_number,
            &image_blob,
            settings.confidence_threshold,
            settings.max_symbols_per_page,
            settings.enable_pattern_matching,
            settings.enable_classifier,
            &config,
            pattern_matcher,
            classifier,
            |stage_event| {
                stage_events.push((stage_event.job_id, stage_event.progress, stage_event.stage));
            },
        );
        (result, stage_events)
    });

    let outcome = match tokio::time::timeout(deadline, handle).await {
        Ok(Ok((result, stage_events))) => {
            for (stage_job_id, progress, stage) in stage_events {
                queue.update_progress(stage_job_id, progress, stage);
                events.push(OrchestratorEvent::DetectionProgress {
                    job_id: stage_job_id,
                    progress,
                    stage: stage.to_string(),
                    current_symbol: None,
                });
            }
            result
        }
        Ok(Err(join_err)) => Err(Error::Other(format!("detection task panicked: {join_err}"))),
        Err(_) => Err(Error::Timeout(format!(
            "detection job '{job_id}' exceeded processing_timeout_ms"
        ))),
    };

    match outcome {
        Ok(result) => {
            for symbol in &result.symbols {
                found_so_far += 1;
                events.push(OrchestratorEvent::SymbolDetected {
                    symbol: symbol.label.clone(),
                    total_found: found_so_far,
                });
            }
            queue.record_success(job.job_id);
            events.push(completion_event(&result));
        }
        Err(e) => {
            let retried = queue.record_failure(job.job_id, &e.to_string());
            if !retried {
                events.push(OrchestratorEvent::DetectionError {
                    job_id: job.job_id,
                    error: e.to_string(),
                    details: None,
                });
            }
        }
    }

    Some(events)
}

fn completion_event(result: &DetectionResult) -> OrchestratorEvent {
    OrchestratorEvent::DetectionCompleted {
        job_id: result.job_id,
        symbol_count: result.symbols.len(),
    }
}
