//! Convenient imports for chaintree.
//!
//! ```ignore
//! use chaintree::prelude::*;
//! ```

// Main entry point
pub use crate::aggregator::{ChainAggregator, ChainAggregatorBuilder};
pub use crate::config::AggregatorConfig;

// Error handling
pub use chaintree_core::{Error, Result};

// Records
pub use chaintree_core::{ChainSegment, MinSummary, MinuteBucket, NodeKey, NodePayload, SummaryUpdate};

// Results
pub use chaintree_engine::{BatchReport, CallChainTree, CancellationToken, MergeOutcome};

// Storage
pub use chaintree_storage::{MemoryStore, StorageGateway};

pub use std::sync::Arc;
