use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context enricher & query enhancer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryEnhancerConfig {
    /// Bound on how many top-k relevant turns the enricher returns.
    #[serde(default = "d_max_context_sources")]
    pub max_context_sources: usize,
    /// Minimum combined score for an enricher source to be usable.
    #[serde(default = "d_relevance_threshold")]
    pub relevance_threshold: f64,
    /// Minimum combined score for an entity candidate to be accepted.
    #[serde(default = "d_entity_resolution_threshold")]
    pub entity_resolution_threshold: f64,
    /// Hard cap on the rewritten query length, in characters.
    #[serde(default = "d_max_rewritten_length")]
    pub max_rewritten_length: usize,
    /// Minimum fraction of original words that must survive rewriting.
    #[serde(default = "d_min_intent_preservation")]
    pub min_intent_preservation: f64,
    /// Emit a structured per-stage trace alongside the result.
    #[serde(default)]
    pub debug: bool,
}

impl Default for QueryEnhancerConfig {
    fn default() -> Self {
        Self {
            max_context_sources: d_max_context_sources(),
            relevance_threshold: d_relevance_threshold(),
            entity_resolution_threshold: d_entity_resolution_threshold(),
            max_rewritten_length: d_max_rewritten_length(),
            min_intent_preservation: d_min_intent_preservation(),
            debug: false,
        }
    }
}

fn d_max_context_sources() -> usize {
    3
}
fn d_relevance_threshold() -> f64 {
    0.3
}
fn d_entity_resolution_threshold() -> f64 {
    0.5
}
fn d_max_rewritten_length() -> usize {
    2_000
}
fn d_min_intent_preservation() -> f64 {
    0.8
}
