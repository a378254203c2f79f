use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context summarizer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Summarization collapses older turns into a single compressed summary
/// once a context grows past `max_turns_before_summarization`, the same
/// way the source's compaction policy shrinks a growing transcript.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "d_max_turns_before_summarization")]
    pub max_turns_before_summarization: usize,
    /// Most recent turns kept verbatim, never summarized.
    #[serde(default = "d_preserve_recent_turns")]
    pub preserve_recent_turns: usize,
    /// Target ratio of (summary length / original length); advisory, the
    /// summarizer does not fail if it can't hit it exactly.
    #[serde(default = "d_target_compression_ratio")]
    pub target_compression_ratio: f64,
    /// Key insights below this relevance score are dropped during
    /// compression.
    #[serde(default = "d_insight_relevance_threshold")]
    pub insight_relevance_threshold: f64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_turns_before_summarization: d_max_turns_before_summarization(),
            preserve_recent_turns: d_preserve_recent_turns(),
            target_compression_ratio: d_target_compression_ratio(),
            insight_relevance_threshold: d_insight_relevance_threshold(),
        }
    }
}

fn d_max_turns_before_summarization() -> usize {
    30
}
fn d_preserve_recent_turns() -> usize {
    5
}
fn d_target_compression_ratio() -> f64 {
    0.4
}
fn d_insight_relevance_threshold() -> f64 {
    0.3
}
