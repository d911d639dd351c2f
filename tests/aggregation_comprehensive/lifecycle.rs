//! Configuration and Lifecycle Tests

use crate::*;
use chaintree::{Error, MinSummary, MinuteBucket, NodeKey};

// =============================================================================
// BUILD
// =============================================================================

#[test]
fn test_build_without_quorum_fails() {
    let err = ChainAggregator::builder()
        .config(AggregatorConfig::default())
        .gateway(Arc::new(MemoryStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::MissingConfiguration(_)));
}

#[test]
fn test_build_without_config_fails() {
    let err = ChainAggregator::builder()
        .gateway(Arc::new(MemoryStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::MissingConfiguration(_)));
}

#[test]
fn test_build_without_gateway_fails() {
    let err = ChainAggregator::builder().config(test_config()).build().err().unwrap();
    assert!(matches!(err, Error::MissingConfiguration(_)));
}

#[test]
fn test_build_rejects_invalid_retry_policy() {
    let mut config = test_config();
    config.retry.max_attempts = 0;
    let err = ChainAggregator::builder()
        .config(config)
        .gateway(Arc::new(MemoryStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn test_build_from_toml() {
    let config = AggregatorConfig::from_toml_str(
        r#"
        [storage]
        quorum = "zk1.internal,zk2.internal"

        [retry]
        max_attempts = 3
        "#,
    )
    .unwrap();

    let (_, aggregator) = create_aggregator_with(config);
    assert_eq!(aggregator.config().retry.max_attempts, 3);
    assert_eq!(
        aggregator.config().storage.quorum_members(),
        vec!["zk1.internal:2181", "zk2.internal:2181"]
    );
}

// =============================================================================
// CLOSE
// =============================================================================

#[test]
fn test_close_flushes_pending_summaries() {
    let (store, aggregator) = create_aggregator();
    let node = NodeKey::new(ENTRY, ROOT);
    let minute = MinuteBucket::from_timestamp_ms(0);
    aggregator.record_summary(&node, minute, &MinSummary::from_call(9, false)).unwrap();

    aggregator.close().unwrap();
    assert!(aggregator.is_closed());
    assert_eq!(store.write_count(), 1);
}

#[test]
fn test_operations_after_close_fail() {
    let (_, aggregator) = create_aggregator();
    aggregator.merge(ENTRY, &root_segments(&["A"])).unwrap();
    aggregator.close().unwrap();

    assert!(matches!(
        aggregator.merge(ENTRY, &root_segments(&["B"])),
        Err(Error::StorageUnavailable(_))
    ));
    assert!(matches!(aggregator.load_tree(ENTRY), Err(Error::StorageUnavailable(_))));
    assert!(matches!(aggregator.flush_summaries(), Err(Error::StorageUnavailable(_))));
}

#[test]
fn test_close_shuts_gateway_down() {
    let (store, aggregator) = create_aggregator();
    aggregator.close().unwrap();

    let other = ChainAggregator::builder()
        .config(test_config())
        .gateway(store)
        .build()
        .unwrap();
    assert!(matches!(other.load_tree(ENTRY), Err(Error::StorageUnavailable(_))));
}

#[test]
fn test_close_twice_is_noop() {
    let (_, aggregator) = create_aggregator();
    aggregator.close().unwrap();
    aggregator.close().unwrap();
}

#[test]
fn test_close_reports_failed_flush() {
    let (store, aggregator) = create_aggregator();
    aggregator
        .record_summary(&NodeKey::new(ENTRY, ROOT), MinuteBucket::from_timestamp_ms(0), &MinSummary::from_call(1, false))
        .unwrap();
    store.set_unavailable(true);

    assert!(aggregator.close().is_err());
    assert!(aggregator.is_closed());
}
