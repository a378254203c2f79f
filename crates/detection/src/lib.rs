pub mod pipeline;
pub mod queue;

pub use pipeline::{BoundingBox, Candidate, DetectionPipeline, DetectionResult, StageEvent};
pub use queue::{DetectionJob, DetectionQueue, JobSettings, JobStatus, QueueStats};
