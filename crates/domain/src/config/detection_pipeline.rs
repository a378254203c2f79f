use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Detection pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionPipelineConfig {
    /// IoU above which two candidate boxes are merged as the same symbol.
    #[serde(default = "d_merge_iou_threshold")]
    pub merge_iou_threshold: f64,
    /// Candidates outside this aspect-ratio range are dropped at
    /// finalization.
    #[serde(default = "d_min_aspect_ratio")]
    pub min_aspect_ratio: f64,
    #[serde(default = "d_max_aspect_ratio")]
    pub max_aspect_ratio: f64,
    /// Candidates outside this bounding-box area range (px²) are dropped.
    #[serde(default = "d_min_area")]
    pub min_area: f64,
    #[serde(default = "d_max_area")]
    pub max_area: f64,
    /// End-to-end deadline for one page, in milliseconds.
    #[serde(default = "d_page_timeout_ms")]
    pub page_timeout_ms: u64,
}

impl Default for DetectionPipelineConfig {
    fn default() -> Self {
        Self {
            merge_iou_threshold: d_merge_iou_threshold(),
            min_aspect_ratio: d_min_aspect_ratio(),
            max_aspect_ratio: d_max_aspect_ratio(),
            min_area: d_min_area(),
            max_area: d_max_area(),
            page_timeout_ms: d_page_timeout_ms(),
        }
    }
}

fn d_merge_iou_threshold() -> f64 {
    0.5
}
fn d_min_aspect_ratio() -> f64 {
    0.2
}
fn d_max_aspect_ratio() -> f64 {
    5.0
}
fn d_min_area() -> f64 {
    16.0
}
fn d_max_area() -> f64 {
    250_000.0
}
fn d_page_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DetectionPipelineConfig::default();
        assert!((cfg.merge_iou_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.page_timeout_ms, 30_000);
    }
}
