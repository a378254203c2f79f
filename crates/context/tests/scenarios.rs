use sa_context::{ContextStore, Enricher, FollowUpDetector, QueryEnhancer, QueryRecord, ResponseRecord};
use sa_domain::config::{ContextStoreConfig, FollowUpConfig, QueryEnhancerConfig};

fn enhancer_config() -> QueryEnhancerConfig {
    QueryEnhancerConfig {
        entity_resolution_threshold: 0.2,
        ..QueryEnhancerConfig::default()
    }
}

#[test]
fn fresh_session_component_question() {
    let store = ContextStore::new(ContextStoreConfig::default());
    let ctx = store.create_context("s1");

    let follow_up = FollowUpDetector::detect(&ctx, "What is this resistor?", &FollowUpConfig::default());
    assert!(follow_up.confidence < FollowUpConfig::default().confidence_threshold || follow_up.detected_references.is_empty());

    let mut query = QueryRecord::new("What is this resistor?");
    query.entities = vec!["resistor".into()];
    let updated = store
        .add_turn(ctx.context_id, query, ResponseRecord::new("a fixed resistor", 0.9), false)
        .unwrap();

    assert_eq!(updated.turn_count(), 1);
    let entity = updated.cumulative_context.entity("resistor").expect("resistor entity recorded");
    assert_eq!(entity.mentions.len(), 1);
}

#[test]
fn pronoun_follow_up_resolves_to_prior_entity() {
    let store = ContextStore::new(ContextStoreConfig::default());
    let ctx = store.create_context("s1");

    let mut q1 = QueryRecord::new("What is this resistor?");
    q1.entities = vec!["resistor".into()];
    let ctx = store
        .add_turn(ctx.context_id, q1, ResponseRecord::new("a fixed resistor", 0.9), false)
        .unwrap();

    let follow_up = FollowUpDetector::detect(&ctx, "What is its resistance value?", &FollowUpConfig::default());
    assert!(follow_up.confidence >= 0.7);
    assert_eq!(follow_up.detected_references[0].resolved_entity.as_deref(), Some("resistor"));

    let enhanced = QueryEnhancer::enhance(&ctx, "What is its resistance value?", &enhancer_config(), &FollowUpConfig::default());
    assert!(enhanced.rewritten_query.contains("resistor"));

    let mut q2 = QueryRecord::new("What is its resistance value?");
    q2.entities = vec!["resistor".into()];
    let updated = store
        .add_turn(ctx.context_id, q2, ResponseRecord::new("330 ohms", 0.85), true)
        .unwrap();
    assert!(updated.conversation_thread[1].follow_up_detected);
}

#[test]
fn sessions_resolve_independent_entities() {
    let store = ContextStore::new(ContextStoreConfig::default());

    let ctx_a = store.create_context("sA");
    let mut qa = QueryRecord::new("Where is the capacitor?");
    qa.entities = vec!["capacitor".into()];
    let ctx_a = store
        .add_turn(ctx_a.context_id, qa, ResponseRecord::new("top left", 0.9), false)
        .unwrap();

    let ctx_b = store.create_context("sB");
    let mut qb = QueryRecord::new("Where is the inductor?");
    qb.entities = vec!["inductor".into()];
    let ctx_b = store
        .add_turn(ctx_b.context_id, qb, ResponseRecord::new("bottom right", 0.9), false)
        .unwrap();

    let enhanced_a = QueryEnhancer::enhance(&ctx_a, "How does it work?", &enhancer_config(), &FollowUpConfig::default());
    let enhanced_b = QueryEnhancer::enhance(&ctx_b, "How does it work?", &enhancer_config(), &FollowUpConfig::default());

    assert!(enhanced_a.rewritten_query.contains("capacitor"));
    assert!(!enhanced_a.rewritten_query.contains("inductor"));
    assert!(enhanced_b.rewritten_query.contains("inductor"));
    assert!(!enhanced_b.rewritten_query.contains("capacitor"));

    let _ = Enricher::score_turns(&ctx_a, "capacitor", 3);
}
