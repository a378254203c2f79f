//! Per-page detection pipeline.
//!
//! Pattern-matching and classification are pluggable: the pipeline owns the
//! merge/score/finalize logic, while the actual symbol-recognition backends
//! are supplied by the caller as plain functions over the page's image
//! bytes. This keeps the pipeline itself free of any particular CV stack
//! while still following a concrete, testable stage contract.

use sa_domain::config::DetectionPipelineConfig;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0.0 {
            f64::INFINITY
        } else {
            self.width / self.height
        }
    }

    /// Intersection-over-union against another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub detection_method: String,
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub job_id: Uuid,
    pub page_number: u32,
    pub symbols: Vec<Candidate>,
}

pub struct StageEvent {
    pub job_id: Uuid,
    pub progress: u8,
    pub stage: &'static str,
}

pub struct DetectionPipeline;

impl DetectionPipeline {
    /// Run all five stages for one page. `pattern_matcher`/`classifier` are
    /// only invoked when the job settings enable them.
    pub fn run(
        job_id: Uuid,
        page_number: u32,
        image_blob: &[u8],
        confidence_threshold: f64,
        max_symbols: usize,
        enable_pattern_matching: bool,
        enable_classifier: bool,
        config: &DetectionPipelineConfig,
        pattern_matcher: impl Fn(&[u8]) -> Vec<Candidate>,
        classifier: impl Fn(&[u8]) -> Vec<Candidate>,
        mut on_stage: impl FnMut(StageEvent),
    ) -> Result<DetectionResult> {
        if image_blob.is_empty() {
            return Err(Error::ValidationFailure("image blob is empty".into()));
        }

        // 1. Preprocess.
        on_stage(StageEvent {
            job_id,
            progress: 10,
            stage: "preprocess",
        });
        let preprocessed = preprocess(image_blob);

        // 2. Pattern matching.
        let pattern_candidates = if enable_pattern_matching {
            pattern_matcher(&preprocessed)
        } else {
            Vec::new()
        };
        on_stage(StageEvent {
            job_id,
            progress: 30,
            stage: "pattern_matching",
        });

        // 3. Classifier, merged with pattern-matching output.
        let classifier_candidates = if enable_classifier {
            classifier(&preprocessed)
        } else {
            Vec::new()
        };
        let merged = merge_candidates(pattern_candidates, classifier_candidates, config.merge_iou_threshold);
        on_stage(StageEvent {
            job_id,
            progress: 50,
            stage: "classifier",
        });

        // 4. Confidence scoring.
        let scored = score_candidates(merged);
        let scoring_span = 85u8.saturating_sub(70);
        let n = scored.len().max(1);
        for i in 0..scored.len() {
            let progress = 70 + ((i as u32 + 1) * scoring_span as u32 / n as u32) as u8;
            on_stage(StageEvent {
                job_id,
                progress: progress.min(85),
                stage: "confidence_scoring",
            });
        }
        if scored.is_empty() {
            on_stage(StageEvent {
                job_id,
                progress: 85,
                stage: "confidence_scoring",
            });
        }

        // 5. Finalization.
        on_stage(StageEvent {
            job_id,
            progress: 90,
            stage: "finalization",
        });
        let mut finalized: Vec<Candidate> = scored
            .into_iter()
            .filter(|c| {
                c.confidence >= confidence_threshold
                    && c.bbox.aspect_ratio() >= config.min_aspect_ratio
                    && c.bbox.aspect_ratio() <= config.max_aspect_ratio
                    && c.bbox.area() >= config.min_area
                    && c.bbox.area() <= config.max_area
            })
            .collect();
        finalized.truncate(max_symbols);

        for (found_so_far, _symbol) in finalized.iter().enumerate() {
            TraceEvent::PipelineStage {
                job_id: job_id.to_string(),
                stage: "symbol_detected".into(),
                progress: 90 + (10 * (found_so_far as u32 + 1) / finalized.len().max(1) as u32) as u8,
            }
            .emit();
        }

        on_stage(StageEvent {
            job_id,
            progress: 100,
            stage: "finalization",
        });

        Ok(DetectionResult {
            job_id,
            page_number,
            symbols: finalized,
        })
    }
}

fn preprocess(image_blob: &[u8]) -> Vec<u8> {
    image_blob.to_vec()
}

/// Merge pattern-matching and classifier candidates: boxes with IoU above
/// the threshold are the same symbol; the higher-confidence one wins and is
/// retagged `detectionMethod = consensus`.
fn merge_candidates(pattern: Vec<Candidate>, classifier: Vec<Candidate>, iou_threshold: f64) -> Vec<Candidate> {
    let mut merged = pattern;
    for candidate in classifier {
        if let Some(existing) = merged
            .iter_mut()
            .find(|m| m.bbox.iou(&candidate.bbox) > iou_threshold)
        {
            if candidate.confidence > existing.confidence {
                existing.label = candidate.label.clone();
                existing.confidence = candidate.confidence;
            }
            existing.detection_method = "consensus".into();
        } else {
            merged.push(candidate);
        }
    }
    merged
}

/// Multi-factor confidence score: blends the raw recognizer confidence with
/// an electrical-principle sanity bonus (roughly square bounding boxes are
/// more plausible symbol crops than extreme slivers).
fn score_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .map(|mut c| {
            let ar = c.bbox.aspect_ratio();
            let plausibility = if ar.is_finite() {
                1.0 - ((ar - 1.0).abs() / 4.0).min(1.0)
            } else {
                0.0
            };
            c.confidence = (0.8 * c.confidence + 0.2 * plausibility).clamp(0.0, 1.0);
            c
        })
        .collect()
}
