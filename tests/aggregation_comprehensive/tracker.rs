//! Merged-ID Tracking Tests
//!
//! Tests for how merged chain ids are recorded, persisted and reconciled.

use crate::*;
use chaintree::{ColumnFamily, MergeTracker, Table, MERGED_CHAIN_IDS_QUALIFIER};

#[test]
fn test_overlapping_batches_apply_only_new_ids() {
    let (_, aggregator) = create_aggregator();

    aggregator.merge(ENTRY, &root_segments(&["A", "B", "C"])).unwrap();
    let outcome = aggregator.merge_detailed(ENTRY, &root_segments(&["B", "C", "D"])).unwrap();

    assert_eq!(outcome.applied, vec!["D"]);
    assert_eq!(outcome.skipped, vec!["B", "C"]);
    let expected: MergeTracker = ["A", "B", "C", "D"].into_iter().collect();
    assert_eq!(outcome.tree.tracker(), &expected);
    assert_eq!(outcome.tree.node(ROOT).unwrap().payload.call_count, 4);
}

#[test]
fn test_multi_segment_chain_is_recorded_once() {
    let (_, aggregator) = create_aggregator();

    let tree = aggregator
        .merge(ENTRY, &[seg("A", ROOT, 10), seg("A", "0.0@db", 3), seg("A", "0.1@cache", 1)])
        .unwrap();

    assert_eq!(tree.tracker().len(), 1);
    assert_eq!(tree.node_count(), 3);
}

#[test]
fn test_mapping_row_mirrors_tracker() {
    let (store, aggregator) = create_aggregator();
    aggregator.merge(ENTRY, &root_segments(&["A", "B"])).unwrap();

    let stored = aggregator
        .load_tree(ENTRY)
        .unwrap()
        .unwrap()
        .tracker()
        .clone();
    let mapped = chaintree::TreeRepository::new(store)
        .load_merged_chain_ids(ENTRY)
        .unwrap()
        .unwrap();
    assert_eq!(mapped, stored);
}

#[test]
fn test_ids_from_mapping_are_honoured() {
    let (store, aggregator) = create_aggregator();
    // ids recorded by another producer before any tree row exists
    store.seed(
        Table::TreeIdCidMapping,
        ENTRY,
        ColumnFamily::TraceId,
        MERGED_CHAIN_IDS_QUALIFIER,
        r#"["A"]"#,
    );

    let outcome = aggregator.merge_detailed(ENTRY, &root_segments(&["A", "B"])).unwrap();

    assert_eq!(outcome.applied, vec!["B"]);
    assert_eq!(outcome.tree.node(ROOT).unwrap().payload.call_count, 1);
    assert!(outcome.tree.has_merged("A"));
}

#[test]
fn test_mapping_failure_keeps_replay_idempotent() {
    let (store, aggregator) = create_aggregator();
    store.fail_table(Table::TreeIdCidMapping);

    let outcome = aggregator.merge_detailed(ENTRY, &root_segments(&["A"])).unwrap();
    assert!(!outcome.tracker_synced);

    store.clear_faults();
    let replay = aggregator.merge_detailed(ENTRY, &root_segments(&["A"])).unwrap();
    assert!(replay.applied.is_empty());
    assert_eq!(replay.tree.node(ROOT).unwrap().payload.call_count, 1);

    // the next real merge brings the mapping row up to date
    aggregator.merge(ENTRY, &root_segments(&["B"])).unwrap();
    let mapped = chaintree::TreeRepository::new(store)
        .load_merged_chain_ids(ENTRY)
        .unwrap()
        .unwrap();
    assert!(mapped.contains("A") && mapped.contains("B"));
}

#[test]
fn test_undecodable_mapping_reads_as_empty() {
    let (store, aggregator) = create_aggregator();
    store.seed(
        Table::TreeIdCidMapping,
        ENTRY,
        ColumnFamily::TraceId,
        MERGED_CHAIN_IDS_QUALIFIER,
        "not a list",
    );

    let outcome = aggregator.merge_detailed(ENTRY, &root_segments(&["A"])).unwrap();
    assert_eq!(outcome.applied, vec!["A"]);
}
