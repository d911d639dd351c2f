//! # Chaintree
//!
//! Idempotent aggregation of traced call chains.
//!
//! Every traced request produces a chain of segments. Chaintree folds the
//! chains of one entry point into a single call-chain tree, counting each
//! chain exactly once even when it is delivered again, and keeps
//! per-minute summaries for every node of the tree.
//!
//! ## Quick Start
//!
//! ```ignore
//! use chaintree::prelude::*;
//!
//! let aggregator = ChainAggregator::builder()
//!     .config(AggregatorConfig::from_file("chaintree.toml")?)
//!     .gateway(Arc::new(MemoryStore::new()))
//!     .build()?;
//!
//! let segment = ChainSegment::new("chain-1", "0@/order/create", NodePayload::single_call(12, false));
//! let tree = aggregator.merge("/order/create", &[segment.clone()])?;
//!
//! // Delivered again: nothing changes
//! let again = aggregator.merge("/order/create", &[segment])?;
//! assert_eq!(tree, again);
//!
//! aggregator.close()?;
//! ```
//!
//! ## Crates
//!
//! - `chaintree-core`: records, codec, table layout, errors
//! - `chaintree-storage`: the [`StorageGateway`] seam and [`MemoryStore`]
//! - `chaintree-engine`: merge engine and summary persistence

#![warn(missing_docs)]

mod aggregator;
mod config;

pub mod prelude;

pub use aggregator::{ChainAggregator, ChainAggregatorBuilder};
pub use config::AggregatorConfig;

pub use chaintree_core::{
    CallChainTreeNode, ChainSegment, ColumnFamily, Error, MinSummary, MinuteBucket, NodeCodec,
    NodeKey, NodePayload, Result, SummaryUpdate, Table, WriteOutcome, MERGED_CHAIN_IDS_QUALIFIER,
};
pub use chaintree_engine::{
    BatchReport, CallChainTree, CancellationToken, FailedUpdate, MergeDelta, MergeEngine,
    MergeOutcome, MergeTracker, MinuteSummaryAccumulator, RetryPolicy, SummaryBatchWriter,
    SummaryStore, SummaryWriterConfig, TreeRepository,
};
pub use chaintree_storage::{Cell, MemoryStore, Row, RowPut, StorageConfig, StorageGateway};
