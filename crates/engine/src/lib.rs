//! Merge engine for call-chain trees
//!
//! This crate folds traced call chains into one aggregated tree per entry
//! point and persists per-minute node summaries:
//! - MergeTracker: set of chain ids already folded into a tree
//! - CallChainTree: nodes keyed by qualifier plus the tracker
//! - MergeEngine: load, apply, conditional write, retry on conflict
//! - SummaryBatchWriter: batched summary writes with per-item outcomes
//! - MinuteSummaryAccumulator: buffers summary deltas between flushes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod cancel;
pub mod merge;
pub mod repository;
pub mod retry;
pub mod summary;
pub mod tracker;
pub mod tree;

pub use accumulator::MinuteSummaryAccumulator;
pub use cancel::CancellationToken;
pub use merge::{MergeEngine, MergeOutcome};
pub use repository::TreeRepository;
pub use retry::RetryPolicy;
pub use summary::{BatchReport, FailedUpdate, SummaryBatchWriter, SummaryStore, SummaryWriterConfig};
pub use tracker::MergeTracker;
pub use tree::{CallChainTree, MergeDelta};
