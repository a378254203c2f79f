//! Analytics summary: grades the system A-F from its current baselines.

use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use sa_domain::config::MonitorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub grade: Grade,
    pub recommendations: Vec<String>,
}

/// Scores retrieval time, enhancement time, and accuracy against their
/// configured thresholds and reduces the three to a single letter grade.
pub fn summarize(
    retrieval: Option<Baseline>,
    enhancement: Option<Baseline>,
    accuracy: Option<Baseline>,
    config: &MonitorConfig,
) -> AnalyticsSummary {
    let mut recommendations = Vec::new();
    let mut points = 0u32;
    let mut graded_dimensions = 0u32;

    if let Some(baseline) = retrieval {
        graded_dimensions += 1;
        if baseline.mean_duration_ms <= config.retrieval_time_alert_ms as f64 {
            points += 4;
        } else if baseline.mean_duration_ms <= 1.5 * config.retrieval_time_alert_ms as f64 {
            points += 2;
            recommendations.push("retrieval latency is trending above baseline; consider indexing hot contexts".into());
        } else {
            recommendations.push("retrieval latency is well above threshold; investigate store contention".into());
        }
    }

    if let Some(baseline) = enhancement {
        graded_dimensions += 1;
        if baseline.mean_duration_ms <= config.enhancement_time_alert_ms as f64 {
            points += 4;
        } else if baseline.mean_duration_ms <= 1.5 * config.enhancement_time_alert_ms as f64 {
            points += 2;
            recommendations.push("query enhancement is slowing down; check context-source count".into());
        } else {
            recommendations.push("query enhancement latency is well above threshold".into());
        }
    }

    if let Some(baseline) = accuracy {
        graded_dimensions += 1;
        if baseline.success_rate >= 1.0 - config.accuracy_drop_threshold {
            points += 4;
        } else if baseline.success_rate >= 1.0 - 2.0 * config.accuracy_drop_threshold {
            points += 2;
            recommendations.push("accuracy has drifted below baseline; review recent provider responses".into());
        } else {
            recommendations.push("accuracy has dropped sharply; consider disabling the affected provider".into());
        }
    }

    let grade = if graded_dimensions == 0 {
        Grade::C
    } else {
        match (points * 4) / (graded_dimensions * 4).max(1) {
            4 => Grade::A,
            3 => Grade::B,
            2 => Grade::C,
            1 => Grade::D,
            _ => Grade::F,
        }
    };

    AnalyticsSummary { grade, recommendations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(mean_duration_ms: f64, success_rate: f64) -> Baseline {
        Baseline {
            mean_duration_ms,
            success_rate,
            samples: 10,
        }
    }

    #[test]
    fn healthy_system_grades_a() {
        let config = MonitorConfig::default();
        let summary = summarize(
            Some(baseline(50.0, 1.0)),
            Some(baseline(100.0, 1.0)),
            Some(baseline(0.0, 0.95)),
            &config,
        );
        assert_eq!(summary.grade, Grade::A);
        assert!(summary.recommendations.is_empty());
    }

    #[test]
    fn degraded_retrieval_lowers_grade_and_recommends() {
        let config = MonitorConfig::default();
        let summary = summarize(
            Some(baseline(1000.0, 1.0)),
            Some(baseline(100.0, 1.0)),
            Some(baseline(0.0, 0.95)),
            &config,
        );
        assert_ne!(summary.grade, Grade::A);
        assert!(!summary.recommendations.is_empty());
    }

    #[test]
    fn no_data_grades_c_with_no_recommendations() {
        let config = MonitorConfig::default();
        let summary = summarize(None, None, None, &config);
        assert_eq!(summary.grade, Grade::C);
        assert!(summary.recommendations.is_empty());
    }
}
