//! In-process conversation context store.
//!
//! Keyed by `contextId`, with a secondary `sessionId -> contextId` index for
//! session-scoped lookup. Backed by a pair of `RwLock`-guarded maps, mirroring
//! the gateway's own session store, but in memory only — conversation context
//! is a cache over the orchestrator facade's lifetime, not a durable store.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use sa_domain::config::ContextStoreConfig;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;

use crate::types::{
    ConversationContext, ConversationTurn, ContextMetadata, CumulativeContext, Mention,
    QueryRecord, ResponseRecord,
};

/// Snapshot of store-wide counters, exposed to the monitor crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub context_count: usize,
    pub total_turns: usize,
    pub total_storage_size: usize,
}

/// A search hit over turn query/response text.
#[derive(Debug, Clone)]
pub struct ContextSearchHit {
    pub context_id: Uuid,
    pub session_id: String,
    pub turn_id: Uuid,
    pub snippet: String,
}

pub struct ContextStore {
    config: ContextStoreConfig,
    contexts: RwLock<HashMap<Uuid, ConversationContext>>,
    by_session: RwLock<HashMap<String, Uuid>>,
}

impl ContextStore {
    pub fn new(config: ContextStoreConfig) -> Self {
        Self {
            config,
            contexts: RwLock::new(HashMap::new()),
            by_session: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh context for `session_id`. If one already exists for
    /// that session, it is returned unchanged rather than replaced.
    pub fn create_context(&self, session_id: &str) -> ConversationContext {
        if let Some(id) = self.by_session.read().get(session_id).copied() {
            if let Some(existing) = self.contexts.read().get(&id) {
                return existing.clone();
            }
        }

        let now = Utc::now();
        let context_id = Uuid::new_v4();
        let context = ConversationContext {
            context_id,
            session_id: session_id.to_owned(),
            conversation_thread: Vec::new(),
            cumulative_context: CumulativeContext::default(),
            last_updated: now,
            expires_at: now + chrono::Duration::hours(self.config.expiration_hours as i64),
            metadata: ContextMetadata {
                created_at: now,
                last_accessed_at: now,
                turn_count: 0,
                storage_size: 0,
                compression_level: 0,
                tags: Vec::new(),
            },
        };

        self.contexts.write().insert(context_id, context.clone());
        self.by_session
            .write()
            .insert(session_id.to_owned(), context_id);

        TraceEvent::ContextCreated {
            context_id: context_id.to_string(),
            session_id: session_id.to_string(),
        }
        .emit();
        context
    }

    /// Return a snapshot, bumping `lastAccessedAt`.
    pub fn get_context(&self, context_id: Uuid) -> Option<ConversationContext> {
        let mut contexts = self.contexts.write();
        let context = contexts.get_mut(&context_id)?;
        context.metadata.last_accessed_at = Utc::now();
        Some(context.clone())
    }

    pub fn get_context_by_session(&self, session_id: &str) -> Option<ConversationContext> {
        let id = *self.by_session.read().get(session_id)?;
        self.get_context(id)
    }

    /// Append a turn, updating derived state atomically under one write lock.
    pub fn add_turn(
        &self,
        context_id: Uuid,
        query: QueryRecord,
        response: ResponseRecord,
        follow_up_flag: bool,
    ) -> Result<ConversationContext> {
        let mut contexts = self.contexts.write();
        let context = contexts
            .get_mut(&context_id)
            .ok_or_else(|| Error::Other(format!("no context with id {context_id}")))?;

        if context.conversation_thread.len() >= self.config.max_turns_per_context {
            return Err(Error::ValidationFailure(format!(
                "context {context_id} has reached max_turns_per_context ({}); summarize first",
                self.config.max_turns_per_context
            )));
        }

        let turn_number = context.conversation_thread.len() + 1;
        let turn_id = Uuid::new_v4();
        let timestamp = response.timestamp.max(query.timestamp);

        for (position, entity) in query.entities.iter().enumerate() {
            let key = entity.to_lowercase();
            context.cumulative_context.record_mention(
                &key,
                Mention {
                    text: entity.clone(),
                    entity_type: "unknown".into(),
                    confidence: response.confidence,
                    turn_id,
                    position,
                    first_mentioned: query.timestamp,
                    mention_count: 0,
                },
            );
        }

        let turn = ConversationTurn {
            turn_id,
            turn_number,
            query,
            response,
            context_contributions: Vec::new(),
            follow_up_detected: follow_up_flag,
            timestamp,
        };
        context.conversation_thread.push(turn);

        context.last_updated = timestamp.max(context.last_updated + chrono::Duration::nanoseconds(1));
        context.metadata.turn_count = context.conversation_thread.len();
        context.metadata.storage_size = estimate_size(context);
        context.expires_at = context
            .expires_at
            .max(context.last_updated + chrono::Duration::hours(1));

        TraceEvent::TurnAppended {
            context_id: context_id.to_string(),
            turn_number: turn_number as u32,
            follow_up_detected: follow_up_flag,
        }
        .emit();

        Ok(context.clone())
    }

    /// Remove contexts whose `expiresAt` has passed. Returns the count removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut contexts = self.contexts.write();
        let expired: Vec<Uuid> = contexts
            .iter()
            .filter(|(_, c)| c.expires_at < now)
            .map(|(id, _)| *id)
            .collect();

        let mut by_session = self.by_session.write();
        for id in &expired {
            if let Some(c) = contexts.remove(id) {
                TraceEvent::ContextExpired {
                    context_id: id.to_string(),
                    session_id: c.session_id.clone(),
                }
                .emit();
                by_session.remove(&c.session_id);
            }
        }
        expired.len()
    }

    /// LRU sweep: remove contexts idle longer than `max_idle_ms`.
    pub fn cleanup_by_idle(&self, max_idle_ms: u64) -> usize {
        let now = Utc::now();
        let mut contexts = self.contexts.write();
        let idle: Vec<Uuid> = contexts
            .iter()
            .filter(|(_, c)| {
                now.signed_duration_since(c.metadata.last_accessed_at)
                    .num_milliseconds()
                    >= max_idle_ms as i64
            })
            .map(|(id, _)| *id)
            .collect();

        let mut by_session = self.by_session.write();
        for id in &idle {
            if let Some(c) = contexts.remove(id) {
                by_session.remove(&c.session_id);
            }
        }
        idle.len()
    }

    pub fn delete_context(&self, context_id: Uuid) -> bool {
        let mut contexts = self.contexts.write();
        if let Some(context) = contexts.remove(&context_id) {
            self.by_session.write().remove(&context.session_id);
            true
        } else {
            false
        }
    }

    pub fn stats(&self) -> StoreStats {
        let contexts = self.contexts.read();
        StoreStats {
            context_count: contexts.len(),
            total_turns: contexts.values().map(|c| c.turn_count()).sum(),
            total_storage_size: contexts.values().map(|c| c.metadata.storage_size).sum(),
        }
    }

    /// Replace a context wholesale — used by the summarizer after
    /// compressing older turns.
    pub fn replace(&self, context: ConversationContext) {
        self.contexts.write().insert(context.context_id, context);
    }

    /// Naive substring search over every turn's query/response text.
    pub fn search_contexts(&self, query: &str, limit: usize) -> Vec<ContextSearchHit> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for context in self.contexts.read().values() {
            for turn in &context.conversation_thread {
                let haystack = format!("{} {}", turn.query.text, turn.response.summary);
                if haystack.to_lowercase().contains(&needle) {
                    hits.push(ContextSearchHit {
                        context_id: context.context_id,
                        session_id: context.session_id.clone(),
                        turn_id: turn.turn_id,
                        snippet: preview(&haystack, 160),
                    });
                    if hits.len() >= limit {
                        return hits;
                    }
                }
            }
        }
        hits
    }
}

fn estimate_size(context: &ConversationContext) -> usize {
    serde_json::to_vec(context).map(|b| b.len()).unwrap_or(0)
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ContextStore {
        ContextStore::new(ContextStoreConfig::default())
    }

    #[test]
    fn create_context_is_idempotent_per_session() {
        let store = store();
        let a = store.create_context("sess-1");
        let b = store.create_context("sess-1");
        assert_eq!(a.context_id, b.context_id);
    }

    #[test]
    fn add_turn_updates_counters() {
        let store = store();
        let ctx = store.create_context("sess-1");
        let q = QueryRecord::new("what about the resistor?");
        let r = ResponseRecord::new("it's R12", 0.9);
        let updated = store.add_turn(ctx.context_id, q, r, false).unwrap();
        assert_eq!(updated.turn_count(), 1);
        assert_eq!(updated.metadata.turn_count, 1);
        assert_eq!(updated.conversation_thread[0].turn_number, 1);
    }

    #[test]
    fn add_turn_rejects_past_max_turns() {
        let mut cfg = ContextStoreConfig::default();
        cfg.max_turns_per_context = 1;
        let store = ContextStore::new(cfg);
        let ctx = store.create_context("sess-1");
        store
            .add_turn(
                ctx.context_id,
                QueryRecord::new("a"),
                ResponseRecord::new("b", 0.5),
                false,
            )
            .unwrap();
        let result = store.add_turn(
            ctx.context_id,
            QueryRecord::new("c"),
            ResponseRecord::new("d", 0.5),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn get_context_by_session_resolves_through_index() {
        let store = store();
        let ctx = store.create_context("sess-2");
        let fetched = store.get_context_by_session("sess-2").unwrap();
        assert_eq!(fetched.context_id, ctx.context_id);
    }

    #[test]
    fn cleanup_expired_removes_stale_entries() {
        let store = store();
        let ctx = store.create_context("sess-3");
        {
            let mut contexts = store.contexts.write();
            let c = contexts.get_mut(&ctx.context_id).unwrap();
            c.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert!(store.get_context(ctx.context_id).is_none());
    }

    #[test]
    fn search_contexts_matches_case_insensitively() {
        let store = store();
        let ctx = store.create_context("sess-4");
        store
            .add_turn(
                ctx.context_id,
                QueryRecord::new("where is the Capacitor"),
                ResponseRecord::new("C3 near the top edge", 0.7),
                false,
            )
            .unwrap();
        let hits = store.search_contexts("capacitor", 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn entity_mention_counts_are_monotonic() {
        let store = store();
        let ctx = store.create_context("sess-5");
        let mut q1 = QueryRecord::new("where is r12");
        q1.entities = vec!["r12".into()];
        store
            .add_turn(ctx.context_id, q1, ResponseRecord::new("there", 0.8), false)
            .unwrap();
        let mut q2 = QueryRecord::new("what about r12 again");
        q2.entities = vec!["r12".into()];
        let updated = store
            .add_turn(ctx.context_id, q2, ResponseRecord::new("same", 0.8), true)
            .unwrap();
        let entity = updated.cumulative_context.entity("r12").unwrap();
        assert_eq!(entity.mentions.len(), 2);
        assert_eq!(entity.mentions[0].mention_count, 1);
        assert_eq!(entity.mentions[1].mention_count, 2);
    }
}
