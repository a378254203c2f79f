//! Durable detection job queue.
//!
//! In-memory equivalent of the gateway's `TaskStore`/`TaskRunner` pair: jobs
//! live in one map keyed by id, a FIFO of pending ids feeds worker pull, and
//! bounded rings retain the last N terminal jobs for inspection after the
//! queue would otherwise have forgotten them.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sa_domain::config::DetectionQueueConfig;
use sa_domain::trace::TraceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    pub confidence_threshold: f64,
    pub max_symbols_per_page: usize,
    pub enable_pattern_matching: bool,
    pub enable_classifier: bool,
    pub enable_llm_validation: bool,
    pub processing_timeout_ms: u64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            max_symbols_per_page: 200,
            enable_pattern_matching: true,
            enable_classifier: true,
            enable_llm_validation: false,
            processing_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionJob {
    pub job_id: Uuid,
    pub document_id: String,
    pub session_id: String,
    pub page_number: u32,
    #[serde(skip)]
    pub image_blob: Vec<u8>,
    pub settings: JobSettings,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub progress_stage: String,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set by `record_failure` to `now + backoff_for(attempt)`. `dequeue`
    /// skips a pending job until this elapses, so retries actually back off
    /// instead of spinning the queue immediately.
    #[serde(default)]
    pub retry_not_before: Option<DateTime<Utc>>,
}

pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

pub struct DetectionQueue {
    config: DetectionQueueConfig,
    jobs: Mutex<HashMap<Uuid, DetectionJob>>,
    pending: Mutex<VecDeque<Uuid>>,
    completed_ring: Mutex<VecDeque<Uuid>>,
    failed_ring: Mutex<VecDeque<Uuid>>,
}

impl DetectionQueue {
    pub fn new(config: DetectionQueueConfig) -> Self {
        Self {
            config: config.clamped(),
            jobs: Mutex::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
            completed_ring: Mutex::new(VecDeque::new()),
            failed_ring: Mutex::new(VecDeque::new()),
        }
    }

    pub fn enqueue(
        &self,
        document_id: impl Into<String>,
        session_id: impl Into<String>,
        page_number: u32,
        image_blob: Vec<u8>,
        settings: JobSettings,
    ) -> Uuid {
        let job_id = Uuid::new_v4();
        let document_id = document_id.into();
        let job = DetectionJob {
            job_id,
            document_id: document_id.clone(),
            session_id: session_id.into(),
            page_number,
            image_blob,
            settings,
            created_at: Utc::now(),
            status: JobStatus::Pending,
            progress_percent: 0,
            progress_stage: "queued".into(),
            attempt: 0,
            error: None,
            retry_not_before: None,
        };
        self.jobs.lock().insert(job_id, job);
        self.pending.lock().push_back(job_id);

        TraceEvent::JobEnqueued {
            job_id: job_id.to_string(),
            document_id,
            page_number,
        }
        .emit();

        job_id
    }

    /// Pull the next pending job for a worker. Marks it `Processing` and
    /// bumps its attempt counter. A job whose `retry_not_before` hasn't
    /// elapsed yet is cycled to the back of the queue instead of being
    /// admitted, so a retrying job actually waits out its backoff delay
    /// rather than being picked up on the very next poll.
    pub fn dequeue(&self) -> Option<DetectionJob> {
        let now = Utc::now();
        let mut pending = self.pending.lock();
        let mut jobs = self.jobs.lock();

        for _ in 0..pending.len() {
            let job_id = pending.pop_front()?;
            let Some(job) = jobs.get(&job_id) else { continue };
            if let Some(not_before) = job.retry_not_before {
                if now < not_before {
                    pending.push_back(job_id);
                    continue;
                }
            }
            let job = jobs.get_mut(&job_id)?;
            job.status = JobStatus::Processing;
            job.attempt += 1;
            job.retry_not_before = None;
            return Some(job.clone());
        }
        None
    }

    pub fn get_job(&self, job_id: Uuid) -> Option<DetectionJob> {
        self.jobs.lock().get(&job_id).cloned()
    }

    /// Update progress mid-flight; terminal transitions go through
    /// `record_success`/`record_failure` instead.
    pub fn update_progress(&self, job_id: Uuid, progress_percent: u8, stage: &str) {
        if let Some(job) = self.jobs.lock().get_mut(&job_id) {
            job.progress_percent = progress_percent;
            job.progress_stage = stage.to_owned();
        }
        TraceEvent::PipelineStage {
            job_id: job_id.to_string(),
            stage: stage.to_owned(),
            progress: progress_percent,
        }
        .emit();
    }

    pub fn record_success(&self, job_id: Uuid) {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&job_id) else { return };
        job.status = JobStatus::Completed;
        job.progress_percent = 100;
        job.progress_stage = "completed".into();
        drop(jobs);

        let mut ring = self.completed_ring.lock();
        ring.push_back(job_id);
        while ring.len() > self.config.retain_completed {
            ring.pop_front();
        }

        TraceEvent::JobCompleted {
            job_id: job_id.to_string(),
            duration_ms: 0,
        }
        .emit();
    }

    /// Record a failed attempt. Re-enqueues with exponential backoff if
    /// attempts remain, otherwise transitions to terminal `Failed`.
    /// Returns `true` if the job will be retried.
    pub fn record_failure(&self, job_id: Uuid, reason: &str) -> bool {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&job_id) else { return false };

        if job.attempt < self.config.max_attempts {
            job.status = JobStatus::Pending;
            job.error = Some(reason.to_owned());
            let attempt = job.attempt;
            job.retry_not_before = Some(Utc::now() + chrono::Duration::from_std(self.backoff_for(attempt)).unwrap_or_default());
            drop(jobs);

            TraceEvent::JobStalled {
                job_id: job_id.to_string(),
                attempt,
            }
            .emit();

            self.pending.lock().push_back(job_id);
            true
        } else {
            job.status = JobStatus::Failed;
            job.error = Some(reason.to_owned());
            let attempts = job.attempt;
            drop(jobs);

            let mut ring = self.failed_ring.lock();
            ring.push_back(job_id);
            while ring.len() > self.config.retain_failed {
                ring.pop_front();
            }

            TraceEvent::JobFailed {
                job_id: job_id.to_string(),
                attempts,
                reason: reason.to_owned(),
            }
            .emit();
            false
        }
    }

    /// Exponential backoff delay before the next attempt, given the job's
    /// current attempt count.
    pub fn backoff_for(&self, attempt: u32) -> std::time::Duration {
        let millis = self.config.initial_backoff_ms.saturating_mul(1u64 << attempt.min(16));
        std::time::Duration::from_millis(millis)
    }

    /// Remove a not-yet-finished job. Returns `false` if it was already
    /// terminal (or missing).
    pub fn cancel_job(&self, job_id: Uuid) -> bool {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&job_id) else { return false };
        if job.status.is_terminal() {
            return false;
        }
        job.status = JobStatus::Cancelled;
        drop(jobs);
        self.pending.lock().retain(|id| *id != job_id);
        true
    }

    pub fn stats(&self) -> QueueStats {
        let jobs = self.jobs.lock();
        let mut stats = QueueStats {
            pending: 0,
            processing: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
        };
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> DetectionQueue {
        DetectionQueue::new(DetectionQueueConfig {
            max_attempts: 3,
            initial_backoff_ms: 2_000,
            retain_completed: 2,
            retain_failed: 2,
            workers: 4,
        })
    }

    #[test]
    fn enqueue_then_dequeue_marks_processing() {
        let q = queue();
        let id = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
        let job = q.dequeue().unwrap();
        assert_eq!(job.job_id, id);
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.attempt, 1);
    }

    #[test]
    fn failure_retries_until_max_attempts_then_terminal() {
        let q = DetectionQueue::new(DetectionQueueConfig {
            max_attempts: 3,
            initial_backoff_ms: 0,
            retain_completed: 2,
            retain_failed: 2,
            workers: 4,
        });
        let id = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
        for expected_retry in [true, true, false] {
            q.dequeue().unwrap();
            let retried = q.record_failure(id, "boom");
            assert_eq!(retried, expected_retry);
        }
        let job = q.get_job(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempt, 3);
    }

    #[test]
    fn cancel_removes_pending_job() {
        let q = queue();
        let id = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
        assert!(q.cancel_job(id));
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn cancel_terminal_job_returns_false() {
        let q = queue();
        let id = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
        q.dequeue().unwrap();
        q.record_success(id);
        assert!(!q.cancel_job(id));
    }

    #[test]
    fn retention_ring_is_bounded() {
        let q = queue();
        for _ in 0..5 {
            let id = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
            q.dequeue().unwrap();
            q.record_success(id);
        }
        assert_eq!(q.completed_ring.lock().len(), 2);
    }

    #[test]
    fn record_failure_defers_redequeue_until_backoff_elapses() {
        let q = DetectionQueue::new(DetectionQueueConfig {
            max_attempts: 3,
            initial_backoff_ms: 50,
            retain_completed: 2,
            retain_failed: 2,
            workers: 4,
        });
        let id = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
        q.dequeue().unwrap();
        assert!(q.record_failure(id, "boom"));

        assert!(q.dequeue().is_none(), "job should not be redequeued before its backoff elapses");

        // initial_backoff_ms=50, attempt=1 -> backoff_for(1) == 100ms.
        std::thread::sleep(std::time::Duration::from_millis(120));
        let job = q.dequeue().expect("job becomes available once backoff elapses");
        assert_eq!(job.job_id, id);
        assert_eq!(job.attempt, 2);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let q = queue();
        assert_eq!(q.backoff_for(0).as_millis(), 2_000);
        assert_eq!(q.backoff_for(1).as_millis(), 4_000);
        assert_eq!(q.backoff_for(2).as_millis(), 8_000);
    }

    #[test]
    fn stats_reflects_job_counts() {
        let q = queue();
        let id1 = q.enqueue("doc1", "s1", 0, vec![], JobSettings::default());
        q.enqueue("doc1", "s1", 1, vec![], JobSettings::default());
        q.dequeue().unwrap();
        q.record_success(id1);
        let stats = q.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
    }
}
