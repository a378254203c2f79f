//! Context enrichment and query rewriting.
//!
//! The enricher scores recent turns by topical overlap and recency decay;
//! the enhancer composes ambiguity detection, retrieval, entity resolution,
//! rewriting, validation and confidence scoring into one pass over a query.

use std::collections::HashSet;

use chrono::Utc;
use sa_domain::config::QueryEnhancerConfig;
use sa_domain::trace::TraceEvent;

use crate::follow_up::FollowUpDetector;
use crate::types::ConversationContext;
use sa_domain::config::FollowUpConfig;

/// Half-life-style recency decay: a turn 10 turns back contributes roughly
/// half the weight of the most recent one.
const RECENCY_DECAY_PER_TURN: f64 = 0.93;

#[derive(Debug, Clone)]
pub struct ScoredTurn {
    pub turn_index: usize,
    pub combined_score: f64,
}

pub struct Enricher;

impl Enricher {
    /// Rank recent turns by a mix of token-overlap relevance and recency
    /// decay, returning the top `max_sources` whose score is usable (the
    /// caller applies the relevance threshold separately so callers can
    /// still inspect rejected candidates).
    pub fn score_turns(context: &ConversationContext, query: &str, max_sources: usize) -> Vec<ScoredTurn> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || context.conversation_thread.is_empty() {
            return Vec::new();
        }

        let n = context.conversation_thread.len();
        let mut scored: Vec<ScoredTurn> = context
            .conversation_thread
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                let haystack = format!("{} {}", turn.query.text, turn.response.summary);
                let overlap = token_overlap(&query_tokens, &tokenize(&haystack));
                let distance_from_end = (n - 1 - i) as i32;
                let recency = RECENCY_DECAY_PER_TURN.powi(distance_from_end);
                ScoredTurn {
                    turn_index: i,
                    combined_score: 0.7 * overlap + 0.3 * recency,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.combined_score.partial_cmp(&a.combined_score).unwrap());
        scored.truncate(max_sources);
        scored
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_owned())
        .collect()
}

fn token_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityKind {
    AmbiguousEntity,
    ContextualDependency,
}

#[derive(Debug, Clone)]
pub struct Ambiguity {
    pub kind: AmbiguityKind,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub surface_text: String,
    pub entity_key: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<String>,
    pub length_ok: bool,
    pub intent_preserved: bool,
    pub sources_relevant: bool,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StageTrace {
    pub stage: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct EnhancedQuery {
    pub original_query: String,
    pub rewritten_query: String,
    pub ambiguities: Vec<Ambiguity>,
    pub resolved_entities: Vec<ResolvedEntity>,
    pub sources_used: Vec<ScoredTurn>,
    pub validation: ValidationReport,
    pub confidence: f64,
    pub trace: Option<Vec<StageTrace>>,
}

pub struct QueryEnhancer;

impl QueryEnhancer {
    pub fn enhance(
        context: &ConversationContext,
        query: &str,
        config: &QueryEnhancerConfig,
        follow_up_config: &FollowUpConfig,
    ) -> EnhancedQuery {
        let mut trace = Vec::new();
        let start = Utc::now();

        // 1. Ambiguity detection.
        let follow_up = FollowUpDetector::detect(context, query, follow_up_config);
        let query_tokens = tokenize(query);
        let mut ambiguities: Vec<Ambiguity> = follow_up
            .detected_references
            .iter()
            .map(|r| Ambiguity {
                kind: AmbiguityKind::ContextualDependency,
                text: r.text.clone(),
            })
            .collect();

        for token in &query_tokens {
            let matches = context
                .cumulative_context
                .extracted_entities
                .iter()
                .filter(|e| e.key.contains(token.as_str()) || token.contains(e.key.as_str()))
                .count();
            if matches >= 2 {
                ambiguities.push(Ambiguity {
                    kind: AmbiguityKind::AmbiguousEntity,
                    text: token.clone(),
                });
            }
        }
        if config.debug {
            trace.push(StageTrace {
                stage: "ambiguity_detection",
                detail: format!("{} ambiguities found", ambiguities.len()),
            });
        }

        // 2. Context retrieval.
        let candidates = Enricher::score_turns(context, query, config.max_context_sources);
        let (used, rejected): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.combined_score >= config.relevance_threshold);
        if config.debug {
            trace.push(StageTrace {
                stage: "context_retrieval",
                detail: format!("{} used, {} rejected below threshold", used.len(), rejected.len()),
            });
        }

        // 3. Entity resolution.
        let mut resolved = Vec::new();
        for token in &query_tokens {
            let mut best: Option<(String, f64)> = None;
            for entity in &context.cumulative_context.extracted_entities {
                let text_sim = if entity.key == *token {
                    1.0
                } else if entity.key.contains(token.as_str()) {
                    0.6
                } else {
                    0.0
                };
                if text_sim == 0.0 {
                    continue;
                }
                let corroboration = if used
                    .iter()
                    .any(|c| context.conversation_thread[c.turn_index].query.entities.contains(&entity.key))
                {
                    0.2
                } else {
                    0.0
                };
                let mention_confidence = entity
                    .mentions
                    .last()
                    .map(|m| m.confidence)
                    .unwrap_or(0.0);
                let combined = 0.5 * text_sim + 0.3 * mention_confidence + 0.2 * (corroboration / 0.2).min(1.0);
                if best.as_ref().map(|(_, s)| combined > *s).unwrap_or(true) {
                    best = Some((entity.key.clone(), combined));
                }
            }
            if let Some((key, score)) = best {
                if score >= config.entity_resolution_threshold {
                    resolved.push(ResolvedEntity {
                        surface_text: token.clone(),
                        entity_key: key,
                        score,
                    });
                }
            }
        }
        if config.debug {
            trace.push(StageTrace {
                stage: "entity_resolution",
                detail: format!("{} entities resolved", resolved.len()),
            });
        }

        // 4. Rewriting.
        let mut rewritten = query.to_owned();
        for entity in &resolved {
            if entity.surface_text != entity.entity_key {
                rewritten = rewritten.replacen(&entity.surface_text, &entity.entity_key, 1);
            }
        }
        if let Some(resolved_entity) = follow_up
            .detected_references
            .iter()
            .find_map(|r| r.resolved_entity.as_ref())
        {
            for pronoun in ["it", "this", "that", "these", "those"] {
                if rewritten.to_lowercase().split_whitespace().any(|w| w == pronoun) {
                    rewritten = replace_word_ci(&rewritten, pronoun, resolved_entity);
                    break;
                }
            }
        }

        if !used.is_empty() || !resolved.is_empty() {
            let mut section = String::from(" [context:");
            for c in used.iter().take(2) {
                let turn = &context.conversation_thread[c.turn_index];
                section.push_str(&format!(" {}", truncate(&turn.response.summary, 60)));
            }
            if !resolved.is_empty() {
                section.push_str(" | entities:");
                for e in &resolved {
                    section.push_str(&format!(" {}={}", e.surface_text, e.entity_key));
                }
            }
            section.push(']');
            rewritten.push_str(&section);
        }
        if config.debug {
            trace.push(StageTrace {
                stage: "rewriting",
                detail: rewritten.clone(),
            });
        }

        // 5. Validation.
        let mut violations = Vec::new();
        let length_ok = rewritten.chars().count() <= config.max_rewritten_length;
        if !length_ok {
            violations.push(format!(
                "rewritten query exceeds max_rewritten_length ({})",
                config.max_rewritten_length
            ));
        }
        let original_words: HashSet<&str> = query.split_whitespace().collect();
        let retained = original_words
            .iter()
            .filter(|w| rewritten.contains(*w))
            .count();
        let intent_ratio = if original_words.is_empty() {
            1.0
        } else {
            retained as f64 / original_words.len() as f64
        };
        let intent_preserved = intent_ratio >= config.min_intent_preservation;
        if !intent_preserved {
            violations.push(format!(
                "only {:.0}% of original words preserved (need {:.0}%)",
                intent_ratio * 100.0,
                config.min_intent_preservation * 100.0
            ));
        }
        let sources_relevant = used.iter().all(|c| c.combined_score >= config.relevance_threshold);
        if !sources_relevant {
            violations.push("one or more chosen sources fell below the relevance threshold".into());
        }
        let validation = ValidationReport {
            violations,
            length_ok,
            intent_preserved,
            sources_relevant,
        };
        if config.debug {
            trace.push(StageTrace {
                stage: "validation",
                detail: format!("passed={}", validation.passed()),
            });
        }

        // 6. Confidence.
        let avg_source_relevance = if used.is_empty() {
            0.0
        } else {
            used.iter().map(|c| c.combined_score).sum::<f64>() / used.len() as f64
        };
        let avg_entity_confidence = if resolved.is_empty() {
            0.0
        } else {
            resolved.iter().map(|e| e.score).sum::<f64>() / resolved.len() as f64
        };
        let ambiguity_resolution_rate = if ambiguities.is_empty() {
            1.0
        } else {
            resolved.len().min(ambiguities.len()) as f64 / ambiguities.len() as f64
        };
        let validation_pass_rate = if validation.passed() { 1.0 } else { 0.0 };

        let confidence = (0.4 * avg_source_relevance
            + 0.3 * avg_entity_confidence
            + 0.2 * ambiguity_resolution_rate
            + 0.1 * validation_pass_rate)
            .clamp(0.0, 1.0);

        if config.debug {
            trace.push(StageTrace {
                stage: "confidence",
                detail: format!(
                    "{:.3} (took {}ms)",
                    confidence,
                    Utc::now().signed_duration_since(start).num_milliseconds()
                ),
            });
        }

        TraceEvent::QueryEnhanced {
            context_id: context.context_id.to_string(),
            confidence,
            references_resolved: resolved.len(),
        }
        .emit();

        EnhancedQuery {
            original_query: query.to_owned(),
            rewritten_query: rewritten,
            ambiguities,
            resolved_entities: resolved,
            sources_used: used,
            validation,
            confidence,
            trace: if config.debug { Some(trace) } else { None },
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_owned()
    } else {
        s.chars().take(max_chars).collect()
    }
}

fn replace_word_ci(text: &str, word: &str, replacement: &str) -> String {
    text.split_whitespace()
        .map(|w| if w.eq_ignore_ascii_case(word) { replacement } else { w })
        .collect::<Vec<_>>()
        .join(" ")
}
