//! Main entry point for chaintree.
//!
//! [`ChainAggregator`] ties the merge engine, the summary writer and the
//! summary buffer to one injected storage gateway.

use crate::config::AggregatorConfig;
use chaintree_core::{
    ChainSegment, Error, MinSummary, MinuteBucket, NodeKey, Result, SummaryUpdate,
};
use chaintree_engine::{
    BatchReport, CallChainTree, CancellationToken, MergeEngine, MergeOutcome,
    MinuteSummaryAccumulator, SummaryBatchWriter, SummaryStore,
};
use chaintree_storage::StorageGateway;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Call-chain aggregation over one storage connection.
///
/// All methods take `&self`; share it between threads with an `Arc`.
///
/// # Example
///
/// ```ignore
/// use chaintree::prelude::*;
///
/// let store = Arc::new(MemoryStore::new());
/// let aggregator = ChainAggregator::builder()
///     .config(AggregatorConfig::with_quorum("zk1,zk2,zk3"))
///     .gateway(store)
///     .build()?;
///
/// aggregator.merge("/order/create", &segments)?;
/// aggregator.record_summary(&node, minute, &MinSummary::from_call(12, false))?;
/// aggregator.close()?;
/// ```
pub struct ChainAggregator {
    config: AggregatorConfig,
    gateway: Arc<dyn StorageGateway>,
    engine: MergeEngine,
    summaries: SummaryStore,
    writer: SummaryBatchWriter,
    pending: MinuteSummaryAccumulator,
    closed: AtomicBool,
}

impl ChainAggregator {
    /// Create a builder
    pub fn builder() -> ChainAggregatorBuilder {
        ChainAggregatorBuilder::new()
    }

    /// The validated configuration
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Merge segments into the tree of `entry_point`
    pub fn merge(&self, entry_point: &str, segments: &[ChainSegment]) -> Result<CallChainTree> {
        self.ensure_open()?;
        self.engine.merge(entry_point, segments)
    }

    /// Merge segments and report applied and skipped chain ids
    pub fn merge_detailed(&self, entry_point: &str, segments: &[ChainSegment]) -> Result<MergeOutcome> {
        self.ensure_open()?;
        self.engine.merge_detailed(entry_point, segments)
    }

    /// Load the stored tree of `entry_point`
    pub fn load_tree(&self, entry_point: &str) -> Result<Option<CallChainTree>> {
        self.ensure_open()?;
        self.engine.load_tree(entry_point)
    }

    /// Load one stored minute summary
    pub fn load_min_summary(&self, node: &NodeKey, minute: MinuteBucket) -> Result<Option<MinSummary>> {
        self.ensure_open()?;
        self.summaries.load_min_summary(&node.row_key(), &minute.qualifier())
    }

    /// Buffer a summary delta until the next flush
    pub fn record_summary(&self, node: &NodeKey, minute: MinuteBucket, delta: &MinSummary) -> Result<()> {
        self.ensure_open()?;
        self.pending.record(node, minute, delta);
        Ok(())
    }

    /// Number of buffered summary cells
    pub fn pending_summaries(&self) -> usize {
        self.pending.pending_len()
    }

    /// Write buffered summaries on top of the stored ones.
    ///
    /// Items that fail stay buffered for the next flush.
    pub fn flush_summaries(&self) -> Result<BatchReport> {
        self.ensure_open()?;
        self.pending.flush(&self.summaries, &self.writer)
    }

    /// Write complete summary values with one batch call
    pub fn submit_summaries(&self, updates: Vec<SummaryUpdate>) -> Result<BatchReport> {
        self.ensure_open()?;
        self.writer.submit(updates)
    }

    /// Like [`submit_summaries`](Self::submit_summaries), unless `cancel` fires first
    pub fn submit_summaries_cancellable(
        &self,
        updates: Vec<SummaryUpdate>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        self.ensure_open()?;
        self.writer.submit_cancellable(updates, cancel)
    }

    /// Flush buffered summaries and shut the gateway down.
    ///
    /// Every later operation fails with `StorageUnavailable`. Closing twice
    /// is a no-op. The gateway is shut down even when the final flush fails;
    /// the flush error is returned in that case.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let flushed = self.pending.flush(&self.summaries, &self.writer);
        match &flushed {
            Ok(report) if !report.is_complete() => {
                warn!(
                    lost = self.pending.pending_len(),
                    "closing with minute summaries that could not be persisted"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "final summary flush failed"),
        }

        self.gateway.shutdown()?;
        info!("chain aggregator closed");
        flushed.map(|_| ())
    }

    /// Whether [`close`](Self::close) was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::StorageUnavailable("aggregator is closed".into()));
        }
        Ok(())
    }
}

/// Builder for [`ChainAggregator`].
///
/// Both a configuration with a storage quorum and a gateway are required.
#[derive(Default)]
pub struct ChainAggregatorBuilder {
    config: Option<AggregatorConfig>,
    gateway: Option<Arc<dyn StorageGateway>>,
}

impl ChainAggregatorBuilder {
    /// Create a builder with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: AggregatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the storage gateway
    pub fn gateway(mut self, gateway: Arc<dyn StorageGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Validate and build.
    ///
    /// Fails with `MissingConfiguration` when the quorum or the gateway is
    /// missing, and `InvalidConfiguration` for unusable settings.
    pub fn build(self) -> Result<ChainAggregator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let gateway = self
            .gateway
            .ok_or_else(|| Error::MissingConfiguration("no storage gateway supplied".into()))?;

        info!(
            quorum = ?config.storage.quorum_members(),
            max_attempts = config.retry.max_attempts,
            max_batch_size = config.summary.max_batch_size,
            "chain aggregator ready"
        );

        Ok(ChainAggregator {
            engine: MergeEngine::new(Arc::clone(&gateway), config.retry.clone()),
            summaries: SummaryStore::new(Arc::clone(&gateway)),
            writer: SummaryBatchWriter::new(Arc::clone(&gateway)),
            pending: MinuteSummaryAccumulator::new(config.summary.max_batch_size),
            closed: AtomicBool::new(false),
            gateway,
            config,
        })
    }
}
