//! Merge Tests
//!
//! Tests for merge, merge_detailed and load_tree.

use crate::*;
use chaintree::{Error, Table};

// =============================================================================
// BASIC MERGES
// =============================================================================

#[test]
fn test_load_unknown_entry_point() {
    let (_, aggregator) = create_aggregator();
    assert!(aggregator.load_tree(ENTRY).unwrap().is_none());
}

#[test]
fn test_merge_builds_tree() {
    let (_, aggregator) = create_aggregator();

    let tree = aggregator
        .merge(
            ENTRY,
            &[
                seg("c1", ROOT, 40),
                seg("c1", "0.0@OrderDao.insert", 15),
                seg("c2", ROOT, 60),
                ChainSegment::new("c3", ROOT, NodePayload::single_call(5, true)),
            ],
        )
        .unwrap();

    assert_eq!(tree.node_count(), 2);
    let root = tree.node(ROOT).unwrap();
    assert_eq!(root.payload.call_count, 3);
    assert_eq!(root.payload.error_count, 1);
    assert_eq!(root.payload.total_cost_ms, 105);
    assert_eq!(root.payload.max_cost_ms, 60);
    assert_eq!(tree.node("0.0@OrderDao.insert").unwrap().payload.call_count, 1);

    let loaded = aggregator.load_tree(ENTRY).unwrap().unwrap();
    assert_eq!(loaded, tree);
}

#[test]
fn test_merges_accumulate_across_batches() {
    let (_, aggregator) = create_aggregator();

    aggregator.merge(ENTRY, &root_segments(&["c1", "c2"])).unwrap();
    let tree = aggregator.merge(ENTRY, &root_segments(&["c3"])).unwrap();

    assert_eq!(tree.node(ROOT).unwrap().payload.call_count, 3);
    assert_eq!(tree.version(), 2);
}

#[test]
fn test_entry_points_are_independent() {
    let (store, aggregator) = create_aggregator();

    aggregator.merge("/a", &[seg("c1", "0@/a", 1)]).unwrap();
    aggregator.merge("/b", &[seg("c1", "0@/b", 1)]).unwrap();

    assert!(aggregator.load_tree("/a").unwrap().unwrap().has_merged("c1"));
    assert!(aggregator.load_tree("/b").unwrap().unwrap().has_merged("c1"));
    assert_eq!(store.row_count(Table::CallChainTreeDetail), 2);
}

// =============================================================================
// IDEMPOTENCE
// =============================================================================

#[test]
fn test_replayed_batch_is_ignored() {
    let (store, aggregator) = create_aggregator();
    let batch = vec![seg("c1", ROOT, 40), seg("c1", "0.0@db", 15), seg("c2", ROOT, 60)];

    let first = aggregator.merge(ENTRY, &batch).unwrap();
    let writes = store.write_count();
    let second = aggregator.merge(ENTRY, &batch).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.write_count(), writes, "replay must not write");
}

#[test]
fn test_replay_with_different_payload_is_ignored() {
    let (_, aggregator) = create_aggregator();

    aggregator.merge(ENTRY, &[seg("c1", ROOT, 40)]).unwrap();
    let outcome = aggregator
        .merge_detailed(ENTRY, &[seg("c1", ROOT, 9_999), seg("c1", "0.1@new", 1)])
        .unwrap();

    assert!(outcome.applied.is_empty());
    assert_eq!(outcome.skipped, vec!["c1"]);
    assert_eq!(outcome.tree.node(ROOT).unwrap().payload.total_cost_ms, 40);
    assert!(outcome.tree.node("0.1@new").is_none());
}

#[test]
fn test_segment_order_does_not_matter() {
    let (_, forward) = create_aggregator();
    let (_, backward) = create_aggregator();
    let mut batch = vec![
        seg("c1", ROOT, 40),
        seg("c1", "0.0@db", 15),
        seg("c2", ROOT, 60),
        seg("c3", "0.0@db", 7),
        seg("c3", ROOT, 22),
    ];

    let a = forward.merge(ENTRY, &batch).unwrap();
    batch.reverse();
    let b = backward.merge(ENTRY, &batch).unwrap();

    assert_eq!(a.nodes(), b.nodes());
    assert_eq!(a.tracker(), b.tracker());
}

#[test]
fn test_merge_detailed_reports_applied_and_skipped() {
    let (_, aggregator) = create_aggregator();
    aggregator.merge(ENTRY, &root_segments(&["c1"])).unwrap();

    let outcome = aggregator.merge_detailed(ENTRY, &root_segments(&["c1", "c2"])).unwrap();

    assert_eq!(outcome.applied, vec!["c2"]);
    assert_eq!(outcome.skipped, vec!["c1"]);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.tracker_synced);
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_empty_entry_point_is_rejected() {
    let (_, aggregator) = create_aggregator();
    let err = aggregator.merge("", &root_segments(&["c1"])).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_unavailable_storage_propagates() {
    let (store, aggregator) = create_aggregator();
    store.set_unavailable(true);

    let err = aggregator.merge(ENTRY, &root_segments(&["c1"])).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert!(err.is_retryable());

    store.set_unavailable(false);
    let tree = aggregator.merge(ENTRY, &root_segments(&["c1"])).unwrap();
    assert_eq!(tree.node(ROOT).unwrap().payload.call_count, 1);
}

#[test]
fn test_failed_tree_write_changes_nothing() {
    let (store, aggregator) = create_aggregator();
    store.fail_table(Table::CallChainTreeDetail);

    assert!(aggregator.merge(ENTRY, &root_segments(&["c1"])).is_err());
    store.clear_faults();
    assert!(aggregator.load_tree(ENTRY).unwrap().is_none());
}
