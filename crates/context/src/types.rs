//! Data model for conversation context: turns, the cumulative entity
//! index, and the context record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The processed query half of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<String>,
    pub intent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
            intent: None,
            timestamp: Utc::now(),
        }
    }
}

/// The response half of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub summary: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn new(summary: impl Into<String>, confidence: f64) -> Self {
        Self {
            summary: summary.into(),
            confidence,
            evidence: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// One query/response exchange within a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    /// 1-based, equal to this turn's position in the ordered thread.
    pub turn_number: usize,
    pub query: QueryRecord,
    pub response: ResponseRecord,
    #[serde(default)]
    pub context_contributions: Vec<String>,
    pub follow_up_detected: bool,
    pub timestamp: DateTime<Utc>,
}

/// A single recorded mention of an entity within the cumulative index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    pub entity_type: String,
    pub confidence: f64,
    pub turn_id: Uuid,
    pub position: usize,
    pub first_mentioned: DateTime<Utc>,
    /// Cumulative mention count for this entity as of this mention; strictly
    /// increasing within one entity's mention list.
    pub mention_count: usize,
}

/// All mentions recorded for one canonical (lowercased) entity key, in the
/// order they were observed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EntityMentions {
    pub key: String,
    pub mentions: Vec<Mention>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContextEntry {
    pub document_id: String,
    pub relevant_pages: Vec<u32>,
    pub key_findings: Vec<String>,
    pub last_referenced: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProgressionEntry {
    pub topic: String,
    pub relevance: f64,
    pub first_introduced: DateTime<Utc>,
    #[serde(default)]
    pub related_topics: Vec<String>,
    #[serde(default)]
    pub query_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipEntry {
    pub source: String,
    pub target: String,
    pub relationship: String,
    pub confidence: f64,
    pub context: String,
}

/// Everything accumulated across a context's thread so far. `extracted_entities`
/// preserves insertion order (first-seen entity first), matching the "ordered
/// mapping" the data model calls for without pulling in an ordered-map crate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CumulativeContext {
    pub extracted_entities: Vec<EntityMentions>,
    #[serde(default)]
    pub document_context: Vec<DocumentContextEntry>,
    #[serde(default)]
    pub topic_progression: Vec<TopicProgressionEntry>,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub relationship_map: Vec<RelationshipEntry>,
}

impl CumulativeContext {
    pub fn entity(&self, key: &str) -> Option<&EntityMentions> {
        self.extracted_entities.iter().find(|e| e.key == key)
    }

    /// Most prominent (highest mention_count, most recent tie-break) entity
    /// key, used by the follow-up detector's referent walk.
    pub fn most_prominent_entity(&self) -> Option<&str> {
        self.extracted_entities
            .iter()
            .max_by_key(|e| e.mentions.last().map(|m| m.mention_count).unwrap_or(0))
            .map(|e| e.key.as_str())
    }

    /// Record a mention, appending to an existing entity's list or creating
    /// a new entry; mention_count is derived, so it is always monotonic.
    pub fn record_mention(&mut self, key: &str, mut mention: Mention) {
        if let Some(entry) = self.extracted_entities.iter_mut().find(|e| e.key == key) {
            mention.mention_count = entry.mentions.len() + 1;
            entry.mentions.push(mention);
        } else {
            mention.mention_count = 1;
            self.extracted_entities.push(EntityMentions {
                key: key.to_owned(),
                mentions: vec![mention],
            });
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub turn_count: usize,
    /// Rough serialized-size estimate in bytes, used by the monitor's
    /// storage-limit alert.
    pub storage_size: usize,
    /// 0 = never summarized; incremented once per `compress()` call.
    pub compression_level: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One conversation's full accumulated state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub context_id: Uuid,
    pub session_id: String,
    pub conversation_thread: Vec<ConversationTurn>,
    pub cumulative_context: CumulativeContext,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: ContextMetadata,
}

impl ConversationContext {
    /// `|conversation_thread| == turn_count`, invariant (i).
    pub fn turn_count(&self) -> usize {
        self.conversation_thread.len()
    }
}
