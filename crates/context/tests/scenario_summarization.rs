use sa_context::{ContextStore, QueryRecord, ResponseRecord};
use sa_domain::config::{ContextStoreConfig, SummarizerConfig};

/// Summarization preserves recent turns and carries forward
/// entities mentioned in them.
#[test]
fn summarization_preserves_recent_critical_component() {
    let store = ContextStore::new(ContextStoreConfig::default());
    let ctx = store.create_context("s1");
    let context_id = ctx.context_id;

    for i in 1..=18u32 {
        let mentions_critical = i >= 13;
        let text = if mentions_critical {
            format!("turn {i} about critical_component_X")
        } else {
            format!("turn {i} about something else")
        };
        let mut query = QueryRecord::new(&text);
        if mentions_critical {
            query.entities = vec!["critical_component_X".into()];
        }
        let response = ResponseRecord::new(&format!("response {i} critical_component_X"), 0.85);
        store.add_turn(context_id, query, response, false).unwrap();
    }

    let config = SummarizerConfig {
        preserve_recent_turns: 5,
        max_turns_before_summarization: 10,
        ..SummarizerConfig::default()
    };

    let output = store.compress(context_id, &config).unwrap().expect("should summarize");

    assert!(output.relevant_entities.contains(&"critical_component_X".to_string()));
    assert!(output.summary.to_lowercase().contains("critical"));
    assert!(output.compression_ratio > 0.0 && output.compression_ratio < 1.0);
}
