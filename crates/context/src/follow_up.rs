//! Rule-based follow-up detection.
//!
//! Four weighted signals plus two shape bonuses are summed and clamped to
//! `[0, 1]`. Pronoun references are resolved against the context's most
//! prominent entity by walking the recent window.

use sa_domain::config::FollowUpConfig;

use crate::types::ConversationContext;

const PRONOUNS: &[&str] = &[
    "it", "its", "this", "that", "these", "those", "they", "them", "their",
];
const TEMPORAL_CUES: &[&str] = &["now", "then", "previous", "previously", "earlier", "before", "after that"];
const IMPLICIT_WORDS: &[&str] = &["also", "too", "additionally", "as well", "furthermore"];
const SPATIAL_CUES: &[&str] = &[
    "here", "there", "above", "below", "nearby", "next to", "adjacent to", "on the left", "on the right",
];

const WEIGHT_PRONOUN: f64 = 0.40;
const WEIGHT_TEMPORAL: f64 = 0.30;
const WEIGHT_IMPLICIT: f64 = 0.25;
const WEIGHT_SPATIAL: f64 = 0.20;
const BONUS_INCOMPLETE: f64 = 0.30;
const BONUS_CONFIRMATION: f64 = 0.35;
/// Added on top of `WEIGHT_PRONOUN` when the pronoun actually resolves to a
/// tracked entity from the conversation's cumulative context — a pronoun
/// that anchors to something concrete is much more likely to be a genuine
/// follow-up than a bare pronoun with nothing to resolve against.
const BONUS_RESOLVED_ANAPHORA: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    Pronoun,
    Temporal,
    Implicit,
    Spatial,
}

#[derive(Debug, Clone)]
pub struct DetectedReference {
    pub reference_type: ReferenceType,
    pub text: String,
    pub source_context: String,
    pub confidence: f64,
    pub resolved_entity: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FollowUpResult {
    pub original_query: String,
    pub detected_references: Vec<DetectedReference>,
    pub contextual_enrichment: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
}

pub struct FollowUpDetector;

impl FollowUpDetector {
    /// Detect follow-up signals in `query` against `context`'s recent window
    /// (bounded by `config.max_lookback_turns`). If the final confidence is
    /// below threshold, the fallback pass returns the query unchanged with
    /// no detected references.
    pub fn detect(
        context: &ConversationContext,
        query: &str,
        config: &FollowUpConfig,
    ) -> FollowUpResult {
        let lower = query.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        let recent: Vec<_> = context
            .conversation_thread
            .iter()
            .rev()
            .take(config.max_lookback_turns)
            .collect();

        let mut references = Vec::new();
        let mut score = 0.0;
        let mut reasons = Vec::new();

        if let Some(pronoun) = PRONOUNS.iter().find(|p| words.contains(p)) {
            score += WEIGHT_PRONOUN;
            reasons.push(format!("pronoun reference \"{pronoun}\""));
            let resolved = context.cumulative_context.most_prominent_entity().map(|s| s.to_owned());
            let mut reference_confidence = WEIGHT_PRONOUN;
            if resolved.is_some() {
                score += BONUS_RESOLVED_ANAPHORA;
                reference_confidence += BONUS_RESOLVED_ANAPHORA;
                reasons.push("pronoun resolved to prior entity".into());
            }
            references.push(DetectedReference {
                reference_type: ReferenceType::Pronoun,
                text: (*pronoun).to_owned(),
                source_context: recent
                    .first()
                    .map(|t| t.query.text.clone())
                    .unwrap_or_default(),
                confidence: reference_confidence.min(1.0),
                resolved_entity: resolved,
            });
        }

        if let Some(cue) = TEMPORAL_CUES.iter().find(|c| lower.contains(*c)) {
            score += WEIGHT_TEMPORAL;
            reasons.push(format!("temporal reference \"{cue}\""));
            references.push(DetectedReference {
                reference_type: ReferenceType::Temporal,
                text: (*cue).to_owned(),
                source_context: String::new(),
                confidence: WEIGHT_TEMPORAL,
                resolved_entity: None,
            });
        }

        if let Some(word) = IMPLICIT_WORDS.iter().find(|w| lower.contains(*w)) {
            score += WEIGHT_IMPLICIT;
            reasons.push(format!("implicit reference \"{word}\""));
            references.push(DetectedReference {
                reference_type: ReferenceType::Implicit,
                text: (*word).to_owned(),
                source_context: String::new(),
                confidence: WEIGHT_IMPLICIT,
                resolved_entity: None,
            });
        }

        if let Some(cue) = SPATIAL_CUES.iter().find(|c| lower.contains(*c)) {
            score += WEIGHT_SPATIAL;
            reasons.push(format!("spatial reference \"{cue}\""));
            references.push(DetectedReference {
                reference_type: ReferenceType::Spatial,
                text: (*cue).to_owned(),
                source_context: String::new(),
                confidence: WEIGHT_SPATIAL,
                resolved_entity: None,
            });
        }

        if is_incomplete_question(&words, query) {
            score += BONUS_INCOMPLETE;
            reasons.push("incomplete-question shape".into());
        }

        if is_confirmation_shape(&lower) {
            score += BONUS_CONFIRMATION;
            reasons.push("confirmation shape".into());
        }

        let confidence = score.clamp(0.0, 1.0);

        if confidence < config.confidence_threshold {
            return FollowUpResult {
                original_query: query.to_owned(),
                detected_references: Vec::new(),
                contextual_enrichment: None,
                confidence,
                reasoning: "below confidence threshold; query returned unchanged".into(),
            };
        }

        let enrichment = recent.first().map(|t| {
            format!(
                "preceding turn: \"{}\" -> \"{}\"",
                t.query.text, t.response.summary
            )
        });

        FollowUpResult {
            original_query: query.to_owned(),
            detected_references: references,
            contextual_enrichment: enrichment,
            confidence,
            reasoning: if reasons.is_empty() {
                "no follow-up signals detected".into()
            } else {
                reasons.join("; ")
            },
        }
    }
}

fn is_incomplete_question(words: &[&str], raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed == "?" {
        return true;
    }
    if words.len() < 3 {
        return true;
    }
    matches!(
        words.first().copied(),
        Some("and") | Some("or") | Some("but")
    )
}

fn is_confirmation_shape(lower: &str) -> bool {
    let trimmed = lower.trim();
    trimmed.ends_with("right?")
        || trimmed.ends_with("correct?")
        || trimmed.starts_with("is that")
        || trimmed.starts_with("so that's")
        || trimmed.starts_with("does that mean")
}
