use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Follow-up detector
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FollowUpConfig {
    /// How many of the most recent turns to consider when resolving a
    /// pronoun or implicit reference.
    #[serde(default = "d_max_lookback_turns")]
    pub max_lookback_turns: usize,
    /// Minimum clamped signal score to declare a query a follow-up.
    #[serde(default = "d_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            max_lookback_turns: d_max_lookback_turns(),
            confidence_threshold: d_confidence_threshold(),
        }
    }
}

fn d_max_lookback_turns() -> usize {
    10
}
fn d_confidence_threshold() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = FollowUpConfig::default();
        assert_eq!(cfg.max_lookback_turns, 10);
        assert!((cfg.confidence_threshold - 0.5).abs() < f64::EPSILON);
    }
}
