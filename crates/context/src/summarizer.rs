//! Context compaction.
//!
//! Preserves the most recent turns verbatim, scores the rest by importance,
//! and folds the scored turns into a single compressed summary string.

use std::collections::HashSet;

use sa_domain::config::SummarizerConfig;

use crate::types::ConversationTurn;

#[derive(Debug, Clone)]
pub struct SummaryOutput {
    pub summary: String,
    pub key_points: Vec<String>,
    pub relevant_entities: Vec<String>,
    pub original_turn_count: usize,
    pub compression_ratio: f64,
}

pub struct Summarizer;

impl Summarizer {
    /// Returns `None` when there is nothing to summarize — fewer turns than
    /// `max_turns_before_summarization` and no memory-pressure override.
    pub fn summarize(
        turns: &[ConversationTurn],
        config: &SummarizerConfig,
        force: bool,
    ) -> Option<SummaryOutput> {
        if turns.len() <= config.preserve_recent_turns {
            return None;
        }
        if !force && turns.len() <= config.max_turns_before_summarization {
            return None;
        }

        let split = turns.len() - config.preserve_recent_turns;
        let (older, preserved) = turns.split_at(split);

        // Already-summarized idempotency: a single synthetic "summary" turn
        // among the older set is passed through unchanged within tolerance.
        if older.len() == 1 && older[0].context_contributions.iter().any(|t| t == "summarized") {
            return Some(SummaryOutput {
                summary: older[0].response.summary.clone(),
                key_points: extract_key_points(older),
                relevant_entities: entities_in(older),
                original_turn_count: turns.len(),
                compression_ratio: 1.0,
            });
        }

        let mut scored: Vec<(&ConversationTurn, f64)> = older
            .iter()
            .map(|t| (t, importance(t)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let preserved_entities: HashSet<String> = preserved
            .iter()
            .flat_map(|t| t.query.entities.iter().cloned())
            .collect();
        let mut mention_counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for t in preserved {
            for e in &t.query.entities {
                *mention_counts.entry(e.clone()).or_default() += 1;
            }
        }
        let carry_forward: Vec<String> = mention_counts
            .into_iter()
            .filter(|(_, count)| *count >= 2)
            .map(|(entity, _)| entity)
            .collect();

        let mut summary_lines = Vec::new();
        let mut key_points = Vec::new();
        for (turn, _score) in &scored {
            summary_lines.push(format!("{} -> {}", turn.query.text, turn.response.summary));
            if turn.response.confidence >= config.insight_relevance_threshold {
                key_points.push(turn.response.summary.clone());
            }
        }
        for entity in &carry_forward {
            if !summary_lines.iter().any(|l| l.to_lowercase().contains(entity)) {
                summary_lines.push(format!("(carried forward: {entity})"));
            }
        }

        let full_text: String = summary_lines.join(" ");
        let target_len = ((full_text.chars().count() as f64) * config.target_compression_ratio).max(1.0) as usize;
        let summary = if full_text.chars().count() > target_len.max(40) {
            full_text.chars().take(target_len.max(40)).collect::<String>()
        } else {
            full_text.clone()
        };

        let original_len: usize = older.iter().map(|t| t.query.text.len() + t.response.summary.len()).sum();
        let compression_ratio = if original_len == 0 {
            0.0
        } else {
            summary.len() as f64 / original_len as f64
        };

        let mut relevant_entities: Vec<String> = carry_forward;
        relevant_entities.extend(preserved_entities);
        relevant_entities.sort();
        relevant_entities.dedup();

        Some(SummaryOutput {
            summary,
            key_points,
            relevant_entities,
            original_turn_count: older.len(),
            compression_ratio,
        })
    }
}

fn importance(turn: &ConversationTurn) -> f64 {
    let confidence = turn.response.confidence;
    let entity_density = turn.query.entities.len() as f64 / 5.0;
    let topic_centrality = if turn.follow_up_detected { 0.2 } else { 0.5 };
    (0.5 * confidence + 0.3 * entity_density.min(1.0) + 0.2 * topic_centrality).clamp(0.0, 1.0)
}

fn extract_key_points(turns: &[ConversationTurn]) -> Vec<String> {
    turns.iter().map(|t| t.response.summary.clone()).collect()
}

fn entities_in(turns: &[ConversationTurn]) -> Vec<String> {
    let mut set: Vec<String> = turns.iter().flat_map(|t| t.query.entities.iter().cloned()).collect();
    set.sort();
    set.dedup();
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueryRecord, ResponseRecord};
    use chrono::Utc;
    use uuid::Uuid;

    fn turn(text: &str, response: &str, confidence: f64, entities: &[&str]) -> ConversationTurn {
        let mut q = QueryRecord::new(text);
        q.entities = entities.iter().map(|s| s.to_string()).collect();
        ConversationTurn {
            turn_id: Uuid::new_v4(),
            turn_number: 0,
            query: q,
            response: ResponseRecord::new(response, confidence),
            context_contributions: vec![],
            follow_up_detected: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn below_threshold_returns_none() {
        let turns = vec![turn("a", "b", 0.5, &[])];
        let cfg = SummarizerConfig::default();
        assert!(Summarizer::summarize(&turns, &cfg, false).is_none());
    }

    #[test]
    fn summarizes_when_over_threshold() {
        let mut turns = Vec::new();
        for i in 0..10 {
            turns.push(turn(&format!("q{i}"), &format!("r{i}"), 0.8, &["r12"]));
        }
        let cfg = SummarizerConfig {
            max_turns_before_summarization: 5,
            preserve_recent_turns: 2,
            ..SummarizerConfig::default()
        };
        let result = Summarizer::summarize(&turns, &cfg, false).unwrap();
        assert_eq!(result.original_turn_count, 8);
        assert!(!result.summary.is_empty());
    }

    #[test]
    fn carries_entities_mentioned_in_multiple_preserved_turns() {
        let mut turns = Vec::new();
        for i in 0..10 {
            turns.push(turn(&format!("q{i}"), &format!("r{i}"), 0.8, &[]));
        }
        turns.push(turn("last2", "resp2", 0.8, &["c7"]));
        turns.push(turn("last1", "resp1", 0.8, &["c7"]));
        let cfg = SummarizerConfig {
            max_turns_before_summarization: 5,
            preserve_recent_turns: 2,
            ..SummarizerConfig::default()
        };
        let result = Summarizer::summarize(&turns, &cfg, false).unwrap();
        assert!(result.relevant_entities.contains(&"c7".to_string()));
    }

    #[test]
    fn force_summarizes_below_max_turns() {
        let turns = vec![
            turn("a", "b", 0.8, &[]),
            turn("c", "d", 0.8, &[]),
            turn("e", "f", 0.8, &[]),
        ];
        let cfg = SummarizerConfig {
            preserve_recent_turns: 1,
            max_turns_before_summarization: 30,
            ..SummarizerConfig::default()
        };
        assert!(Summarizer::summarize(&turns, &cfg, false).is_none());
        assert!(Summarizer::summarize(&turns, &cfg, true).is_some());
    }
}
