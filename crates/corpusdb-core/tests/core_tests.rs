use corpusdb_core::config::{EngineConfig, FusionStrategy};
use corpusdb_core::error::Error;
use corpusdb_core::store::DocumentStore;
use corpusdb_core::types::Document;

#[test]
fn presets_are_valid() {
    for config in [
        EngineConfig::development(),
        EngineConfig::production(),
        EngineConfig::research(),
        EngineConfig::high_security(),
        EngineConfig::high_performance(),
    ] {
        config.validate().expect("preset must validate");
        let sum = config.bm25_weight + config.vector_weight;
        assert!((sum - 1.0).abs() <= 1e-3);
    }
}

#[test]
fn weights_outside_unit_sum_are_rejected() {
    let err = EngineConfig::development().with_weights(0.7, 0.7);
    assert!(err.is_err(), "0.7 + 0.7 must not validate");

    let ok = EngineConfig::development().with_weights(0.25, 0.75);
    assert!(ok.is_ok());
}

#[test]
fn copy_with_override_leaves_source_untouched() {
    let base = EngineConfig::development();
    let derived = base.clone().with_fusion(FusionStrategy::ReciprocalRank);
    assert_eq!(base.fusion, FusionStrategy::WeightedSum);
    assert_eq!(derived.fusion, FusionStrategy::ReciprocalRank);
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(EngineConfig::development().with_dimension(0).is_err());
}

#[test]
fn only_network_class_errors_are_transient() {
    assert!(Error::Network("connection reset".to_string()).is_transient());
    assert!(Error::Timeout("30s elapsed".to_string()).is_transient());
    assert!(Error::RateLimited { retry_after_secs: 1 }.is_transient());

    assert!(!Error::Api { status: 500, message: "oops".to_string() }.is_transient());
    assert!(!Error::Validation("empty id".to_string()).is_transient());
    assert!(!Error::Storage("disk full".to_string()).is_transient());
}

#[test]
fn store_add_get_update() {
    let mut store = DocumentStore::new();
    store.add(&[Document::new("a", "alpha"), Document::new("b", "bravo")]);

    assert_eq!(store.get("a").map(|d| d.content.as_str()), Some("alpha"));
    assert_eq!(store.stats().document_count, 2);

    store.update("a", Document::new("a", "alpha prime"));
    assert_eq!(store.get("a").map(|d| d.content.as_str()), Some("alpha prime"));

    // Update of an absent id is a no-op, not a create.
    store.update("missing", Document::new("missing", "ghost"));
    assert!(store.get("missing").is_none());
    assert_eq!(store.stats().document_count, 2);
}

#[test]
fn store_soft_delete_is_idempotent() {
    let mut store = DocumentStore::new();
    store.add(&[Document::new("a", "alpha")]);

    assert!(store.delete("a"), "first delete removes a live document");
    assert!(!store.delete("a"), "second delete is a no-op");
    assert!(store.get("a").is_none());
    assert_eq!(store.stats().document_count, 0);

    // The id stays known as a tombstone; re-adding revives it.
    store.add(&[Document::new("a", "alpha again")]);
    assert_eq!(store.get("a").map(|d| d.content.as_str()), Some("alpha again"));
}

#[test]
fn store_indices_stay_stable_across_deletes() {
    let mut store = DocumentStore::new();
    store.add(&[
        Document::new("a", "alpha"),
        Document::new("b", "bravo"),
        Document::new("c", "charlie"),
    ]);
    let slot_c = store.slot_of("c").expect("c is stored");

    store.delete("b");
    let fetched = store.get_by_indices(&[slot_c]);
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, "c");

    // Tombstoned slots are skipped, not returned empty.
    let slot_b = store.slot_of("b").expect("tombstone keeps the slot");
    assert!(store.get_by_indices(&[slot_b]).is_empty());
}
