pub mod enricher;
pub mod follow_up;
pub mod store;
pub mod summarizer;
pub mod types;

pub use enricher::{Ambiguity, AmbiguityKind, EnhancedQuery, Enricher, QueryEnhancer, ScoredTurn, ValidationReport};
pub use follow_up::{DetectedReference, FollowUpDetector, FollowUpResult, ReferenceType};
pub use store::{ContextSearchHit, ContextStore, StoreStats};
pub use summarizer::{SummaryOutput, Summarizer};
pub use types::{
    ConversationContext, ConversationTurn, CumulativeContext, Mention, QueryRecord, ResponseRecord,
};

use sa_domain::config::SummarizerConfig;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use uuid::Uuid;

impl ContextStore {
    /// Run the summarizer over a context's older turns and fold the result
    /// back in as a single synthetic turn via `compress`.
    pub fn compress(&self, context_id: Uuid, config: &SummarizerConfig) -> Result<Option<SummaryOutput>> {
        let mut context = self
            .get_context(context_id)
            .ok_or_else(|| Error::Other(format!("no context with id {context_id}")))?;

        let Some(output) = Summarizer::summarize(&context.conversation_thread, config, false) else {
            return Ok(None);
        };

        let split = context.conversation_thread.len() - config.preserve_recent_turns;
        let preserved = context.conversation_thread.split_off(split);

        let summary_turn = ConversationTurn {
            turn_id: Uuid::new_v4(),
            turn_number: 1,
            query: QueryRecord::new("(summarized history)"),
            response: ResponseRecord::new(output.summary.clone(), 1.0),
            context_contributions: vec!["summarized".into()],
            follow_up_detected: false,
            timestamp: context.last_updated,
        };

        context.conversation_thread = std::iter::once(summary_turn).chain(preserved).collect();
        for (i, turn) in context.conversation_thread.iter_mut().enumerate() {
            turn.turn_number = i + 1;
        }
        context.metadata.turn_count = context.conversation_thread.len();
        context.metadata.compression_level += 1;
        context.metadata.storage_size = serde_json::to_vec(&context).map(|b| b.len()).unwrap_or(0);

        TraceEvent::ContextCompressed {
            context_id: context_id.to_string(),
            compression_ratio: output.compression_ratio,
            original_turn_count: output.original_turn_count,
        }
        .emit();

        self.replace(context);
        Ok(Some(output))
    }
}
