//! Minute summary persistence
//!
//! - [`SummaryStore`] reads single summary cells
//! - [`SummaryBatchWriter`] writes many cells with one batch call and
//!   reports the outcome of every item
//!
//! A batch with failed items is not an error: the caller gets a
//! [`BatchReport`] that names each failed item so exactly those can be
//! resubmitted. Only a failure of the batch call itself is returned as `Err`.

use crate::cancel::CancellationToken;
use chaintree_core::{
    ColumnFamily, Error, MinSummary, NodeCodec, Result, SummaryUpdate, Table, WriteOutcome,
};
use chaintree_storage::{RowPut, StorageGateway};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Tuning for summary flushing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryWriterConfig {
    /// Most cells sent in one batch call by a flush
    pub max_batch_size: usize,
}

impl Default for SummaryWriterConfig {
    fn default() -> Self {
        Self { max_batch_size: 1000 }
    }
}

impl SummaryWriterConfig {
    /// Reject unusable settings
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::InvalidConfiguration(
                "summary.max_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Reads minute summaries
#[derive(Clone)]
pub struct SummaryStore {
    gateway: Arc<dyn StorageGateway>,
}

impl SummaryStore {
    /// Create a store over a shared gateway
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    /// Load one summary cell.
    ///
    /// - `None`: no data for this node and minute
    /// - zero summary: the cell exists but is empty, or does not decode
    pub fn load_min_summary(&self, row_key: &str, qualifier: &str) -> Result<Option<MinSummary>> {
        let value = self.gateway.get_cell(
            Table::ChainOneMinuteSummary,
            row_key,
            ColumnFamily::ChainSummary,
            qualifier,
        )?;
        Ok(value.map(|v| {
            NodeCodec::decode_summary(&v).unwrap_or_else(|e| {
                warn!(row_key, qualifier, error = %e, "undecodable minute summary, reading it as zero");
                MinSummary::default()
            })
        }))
    }

    /// Load one summary cell, zero when absent
    pub fn load_or_default(&self, row_key: &str, qualifier: &str) -> Result<MinSummary> {
        Ok(self.load_min_summary(row_key, qualifier)?.unwrap_or_default())
    }
}

/// A batch item that was not persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpdate {
    /// Position in the submitted batch
    pub index: usize,
    /// Row key of the item
    pub row_key: String,
    /// Minute qualifier of the item
    pub qualifier: String,
    /// Reason given by the store
    pub reason: String,
}

/// Per-item outcome of a batch submission, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    updates: Vec<SummaryUpdate>,
    outcomes: Vec<WriteOutcome>,
}

impl BatchReport {
    fn new(updates: Vec<SummaryUpdate>, outcomes: Vec<WriteOutcome>) -> Self {
        Self { updates, outcomes }
    }

    /// Outcomes in input order
    pub fn outcomes(&self) -> &[WriteOutcome] {
        &self.outcomes
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of persisted items
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Whether every item was persisted
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(WriteOutcome::is_ok)
    }

    /// Items that were not persisted
    pub fn failed(&self) -> Vec<FailedUpdate> {
        self.updates
            .iter()
            .zip(&self.outcomes)
            .enumerate()
            .filter_map(|(index, (update, outcome))| {
                outcome.failure().map(|reason| FailedUpdate {
                    index,
                    row_key: update.row_key.clone(),
                    qualifier: update.qualifier.clone(),
                    reason: reason.to_string(),
                })
            })
            .collect()
    }

    /// The submitted updates that were not persisted, ready to resubmit
    pub fn failed_updates(&self) -> Vec<SummaryUpdate> {
        self.updates
            .iter()
            .zip(&self.outcomes)
            .filter(|(_, outcome)| !outcome.is_ok())
            .map(|(update, _)| update.clone())
            .collect()
    }

    /// Append another report, keeping order
    pub fn extend(&mut self, other: BatchReport) {
        self.updates.extend(other.updates);
        self.outcomes.extend(other.outcomes);
    }

    /// `Err(PartialBatchFailure)` if any item failed
    pub fn into_result(self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let failed_rows = self.failed().into_iter().map(|f| f.row_key).collect();
        Err(Error::PartialBatchFailure {
            failed_rows,
            total: self.outcomes.len(),
        })
    }
}

/// Writes minute summaries with one batch call per submission
#[derive(Clone)]
pub struct SummaryBatchWriter {
    gateway: Arc<dyn StorageGateway>,
}

impl SummaryBatchWriter {
    /// Create a writer over a shared gateway
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    /// Persist `updates`; see [`submit_cancellable`](Self::submit_cancellable)
    pub fn submit(&self, updates: Vec<SummaryUpdate>) -> Result<BatchReport> {
        self.submit_cancellable(updates, &CancellationToken::new())
    }

    /// Persist `updates` unless `cancel` fires before the batch call is issued.
    ///
    /// Failed items are logged with their row key and reported in the
    /// returned [`BatchReport`]; they do not make this call fail.
    pub fn submit_cancellable(
        &self,
        updates: Vec<SummaryUpdate>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        if updates.is_empty() {
            return Ok(BatchReport::default());
        }

        let rows: Vec<RowPut> = updates
            .iter()
            .map(|u| {
                RowPut::new(u.row_key.clone()).with_cell(
                    ColumnFamily::ChainSummary,
                    u.qualifier.clone(),
                    NodeCodec::encode_summary(&u.summary),
                )
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!(
                "{} minute summary writes were not issued",
                rows.len()
            )));
        }

        let outcomes = self.gateway.batch_put(Table::ChainOneMinuteSummary, &rows)?;
        if outcomes.len() != rows.len() {
            return Err(Error::StorageUnavailable(format!(
                "batch returned {} outcomes for {} rows",
                outcomes.len(),
                rows.len()
            )));
        }

        let report = BatchReport::new(updates, outcomes);
        let failed = report.failed();
        for item in &failed {
            error!(
                row_key = %item.row_key,
                qualifier = %item.qualifier,
                index = item.index,
                reason = %item.reason,
                "failed to persist minute summary"
            );
        }
        if !failed.is_empty() {
            warn!(failed = failed.len(), total = report.len(), "minute summary batch partially failed");
        }
        Ok(report)
    }
}
