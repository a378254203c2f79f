//! Reduces provider-native responses to the canonical [`AnalysisResponse`].
//!
//! Each vendor adapter extracts raw fields (content, a token count or
//! character lengths to estimate from, an optional explicit confidence) and
//! hands them here, where confidence gets clamped/rounded and content gets
//! length-capped the same way regardless of which vendor produced it.

use crate::traits::AnalysisResponse;
use sa_domain::usage::Usage;
use std::collections::HashMap;

const TRUNCATION_MARKER: &str = "... [truncated]";

/// Raw, not-yet-normalized fields extracted by a vendor-specific parser.
pub struct RawExtraction {
    pub content: String,
    pub usage: Option<Usage>,
    pub prompt_chars: usize,
    /// Explicit confidence from the provider, if any; `None` triggers the
    /// default confidence.
    pub confidence: Option<f64>,
    pub model: String,
    pub metadata: HashMap<String, String>,
}

/// Confidence used when a provider exposes neither an explicit score nor a
/// log-prob-derived one.
const DEFAULT_CONFIDENCE: f64 = 0.8;

pub fn normalize(
    id_prefix: &str,
    raw: RawExtraction,
    response_time_ms: u64,
    max_content_length: usize,
) -> AnalysisResponse {
    let usage = raw
        .usage
        .unwrap_or_else(|| Usage::estimate_from_len(raw.prompt_chars, raw.content.chars().count()));

    let confidence = clamp_and_round(raw.confidence.unwrap_or(DEFAULT_CONFIDENCE));
    let content = truncate(&raw.content, max_content_length);

    AnalysisResponse {
        id: format!("{id_prefix}-{}", uuid::Uuid::new_v4()),
        content,
        confidence,
        tokens_used: usage,
        response_time_ms,
        model: raw.model,
        timestamp: chrono::Utc::now(),
        metadata: raw.metadata,
    }
}

fn clamp_and_round(value: f64) -> f64 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * 1000.0).round() / 1000.0
}

fn truncate(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_len).collect();
    format!("{truncated}{TRUNCATION_MARKER}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(content: &str, confidence: Option<f64>) -> RawExtraction {
        RawExtraction {
            content: content.to_string(),
            usage: None,
            prompt_chars: 40,
            confidence,
            model: "test-model".into(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn confidence_clamped_to_unit_interval() {
        let resp = normalize("p", raw("hi", Some(1.7)), 10, 1000);
        assert_eq!(resp.confidence, 1.0);
        let resp = normalize("p", raw("hi", Some(-0.3)), 10, 1000);
        assert_eq!(resp.confidence, 0.0);
    }

    #[test]
    fn confidence_rounded_to_three_decimals() {
        let resp = normalize("p", raw("hi", Some(0.123456)), 10, 1000);
        assert_eq!(resp.confidence, 0.123);
    }

    #[test]
    fn missing_confidence_uses_default() {
        let resp = normalize("p", raw("hi", None), 10, 1000);
        assert_eq!(resp.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn content_within_limit_is_untouched() {
        let resp = normalize("p", raw("short", Some(0.5)), 10, 1000);
        assert_eq!(resp.content, "short");
    }

    #[test]
    fn content_over_limit_is_truncated_with_marker() {
        let long = "a".repeat(50);
        let resp = normalize("p", raw(&long, Some(0.5)), 10, 10);
        assert_eq!(resp.content.chars().count(), 10 + TRUNCATION_MARKER.chars().count());
        assert!(resp.content.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn missing_usage_falls_back_to_length_estimate() {
        let resp = normalize("p", raw("abcd", None), 10, 1000);
        assert_eq!(resp.tokens_used.completion_tokens, 1);
    }

    #[test]
    fn id_is_prefixed_by_provider() {
        let resp = normalize("claude", raw("x", None), 10, 1000);
        assert!(resp.id.starts_with("claude-"));
    }
}
