//! Concurrency Tests
//!
//! Concurrent merges into one entry point, from threads sharing one
//! aggregator or using separate aggregators over one store.

use crate::*;
use chaintree::{MergeTracker, MinSummary, MinuteBucket, NodeKey};
use std::sync::Barrier;
use std::thread;

const THREADS: usize = 8;
const CHAINS_PER_THREAD: usize = 25;

/// Retries cover every commit the other threads can make
fn contended_config() -> AggregatorConfig {
    let mut config = AggregatorConfig::with_quorum("zk1");
    config.retry = RetryPolicy {
        max_attempts: (THREADS * CHAINS_PER_THREAD) as u32 + 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
        jitter: true,
    };
    config
}

#[test]
fn test_disjoint_concurrent_merges_lose_nothing() {
    let (_, aggregator) = create_aggregator_with(contended_config());
    let aggregator = Arc::new(aggregator);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let aggregator = Arc::clone(&aggregator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..CHAINS_PER_THREAD {
                    let chain = format!("t{}-c{}", t, i);
                    let worker = format!("1@worker-{}", t);
                    aggregator
                        .merge(ENTRY, &[seg(&chain, ROOT, 10), seg(&chain, &worker, 1)])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tree = aggregator.load_tree(ENTRY).unwrap().unwrap();
    let total = (THREADS * CHAINS_PER_THREAD) as u64;
    let root = tree.node(ROOT).unwrap();
    assert_eq!(root.payload.call_count, total);
    assert_eq!(root.payload.total_cost_ms, total * 10);
    assert_eq!(tree.tracker().len(), THREADS * CHAINS_PER_THREAD);
    for t in 0..THREADS {
        let worker = tree.node(&format!("1@worker-{}", t)).unwrap();
        assert_eq!(worker.payload.call_count, CHAINS_PER_THREAD as u64);
    }
    assert_eq!(tree.version(), total);
}

#[test]
fn test_competing_deliveries_of_same_chains_count_once() {
    let store = Arc::new(MemoryStore::new());
    let barrier = Arc::new(Barrier::new(4));
    let chains: Vec<String> = (0..50).map(|i| format!("c{}", i)).collect();

    // separate aggregators over one store behave like separate processes
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let aggregator = ChainAggregator::builder()
                .config(contended_config())
                .gateway(store.clone())
                .build()
                .unwrap();
            let barrier = Arc::clone(&barrier);
            let chains = chains.clone();
            thread::spawn(move || {
                barrier.wait();
                for chunk in chains.chunks(5) {
                    let batch: Vec<_> = chunk.iter().map(|c| seg(c, ROOT, 10)).collect();
                    aggregator.merge(ENTRY, &batch).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tree = chaintree::TreeRepository::new(store).load(ENTRY).unwrap().unwrap();
    let expected: MergeTracker = chains.iter().map(String::as_str).collect();
    assert_eq!(tree.tracker(), &expected);
    assert_eq!(tree.node(ROOT).unwrap().payload.call_count, 50);
}

#[test]
fn test_entry_points_do_not_interfere() {
    let (store, aggregator) = create_aggregator();
    let aggregator = Arc::new(aggregator);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                let entry = format!("/entry-{}", t);
                let root = format!("0@{}", entry);
                for i in 0..20 {
                    let outcome = aggregator
                        .merge_detailed(&entry, &[seg(&format!("c{}", i), &root, 1)])
                        .unwrap();
                    assert_eq!(outcome.attempts, 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.row_count(chaintree::Table::CallChainTreeDetail), 4);
}

#[test]
fn test_concurrent_summary_recording() {
    let (_, aggregator) = create_aggregator();
    let aggregator = Arc::new(aggregator);
    let node = NodeKey::new(ENTRY, ROOT);
    let minute = MinuteBucket::from_timestamp_ms(1_476_880_245_123);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let aggregator = Arc::clone(&aggregator);
            let node = node.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    aggregator
                        .record_summary(&node, minute, &MinSummary::from_call(2, false))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(aggregator.flush_summaries().unwrap().is_complete());
    let stored = aggregator.load_min_summary(&node, minute).unwrap().unwrap();
    assert_eq!(stored.total_call, 400);
    assert_eq!(stored.total_cost_time, 800);
}
