//! Aggregation Comprehensive Test Suite
//!
//! Exercises the public `ChainAggregator` surface against `MemoryStore`.
//!
//! ## Key Verification Points
//!
//! 1. Merging is idempotent per chain id and independent of segment order
//! 2. The merged-id set is persisted and reconciled on load
//! 3. Concurrent merges into one entry point lose nothing
//! 4. Batch summary writes report every item in order
//! 5. Configuration and lifecycle errors surface at the right time
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test aggregation_comprehensive
//!
//! # Concurrency tests only
//! cargo test --test aggregation_comprehensive concurrency::
//! ```

use std::sync::Arc;

use chaintree::{
    AggregatorConfig, ChainAggregator, ChainSegment, MemoryStore, NodePayload, RetryPolicy,
};

// Test modules
pub mod concurrency;
pub mod lifecycle;
pub mod merge;
pub mod tracker;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Entry point used by most tests
pub const ENTRY: &str = "/order/create";

/// Root node qualifier of [`ENTRY`]
pub const ROOT: &str = "0@/order/create";

/// Configuration with a quorum and no retry sleeps
pub fn test_config() -> AggregatorConfig {
    let mut config = AggregatorConfig::with_quorum("zk1,zk2,zk3");
    config.retry = RetryPolicy::immediate(8);
    config
}

/// Create a store and an aggregator over it
pub fn create_aggregator() -> (Arc<MemoryStore>, ChainAggregator) {
    create_aggregator_with(test_config())
}

/// Create a store and an aggregator with the given configuration
pub fn create_aggregator_with(config: AggregatorConfig) -> (Arc<MemoryStore>, ChainAggregator) {
    let store = Arc::new(MemoryStore::new());
    let aggregator = ChainAggregator::builder()
        .config(config)
        .gateway(store.clone())
        .build()
        .expect("Failed to build aggregator");
    (store, aggregator)
}

/// One successful call of `cost_ms` on node `qualifier`
pub fn seg(chain_id: &str, qualifier: &str, cost_ms: u64) -> ChainSegment {
    ChainSegment::new(chain_id, qualifier, NodePayload::single_call(cost_ms, false))
}

/// One root segment per chain id, each costing 10ms
pub fn root_segments(chain_ids: &[&str]) -> Vec<ChainSegment> {
    chain_ids.iter().map(|id| seg(id, ROOT, 10)).collect()
}
