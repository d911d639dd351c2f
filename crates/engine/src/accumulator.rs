//! In-memory buffering of minute summaries
//!
//! Producers record per-call deltas; a flush reads each stored cell, adds the
//! buffered delta and writes the totals back in batches of at most
//! `max_batch_size` cells.
//!
//! Deltas that did not reach storage go back into the buffer: items the batch
//! reported as failed, and every undelivered item when a flush returns `Err`.
//! The next flush retries them, so callers must not resubmit failed items
//! from the returned report themselves.
//!
//! The read-modify-write assumes one flusher per node key.

use crate::summary::{BatchReport, SummaryBatchWriter, SummaryStore};
use chaintree_core::{MinSummary, MinuteBucket, NodeKey, Result, SummaryUpdate};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Thread-safe buffer of per-minute summary deltas
#[derive(Debug)]
pub struct MinuteSummaryAccumulator {
    pending: Mutex<BTreeMap<(String, String), MinSummary>>,
    max_batch_size: usize,
}

impl MinuteSummaryAccumulator {
    /// Create an accumulator flushing at most `max_batch_size` cells per batch
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Add `delta` to the buffered summary of a node in a minute
    pub fn record(&self, node: &NodeKey, minute: MinuteBucket, delta: &MinSummary) {
        self.record_raw(node.row_key(), minute.qualifier(), delta);
    }

    /// Add `delta` to the buffered summary of a raw row key and qualifier
    pub fn record_raw(&self, row_key: impl Into<String>, qualifier: impl Into<String>, delta: &MinSummary) {
        self.pending
            .lock()
            .entry((row_key.into(), qualifier.into()))
            .or_default()
            .combine(delta);
    }

    /// Number of buffered cells
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Take every buffered delta, ordered by row key then qualifier
    pub fn drain(&self) -> Vec<SummaryUpdate> {
        std::mem::take(&mut *self.pending.lock())
            .into_iter()
            .map(|((row_key, qualifier), summary)| SummaryUpdate::new(row_key, qualifier, summary))
            .collect()
    }

    /// Put deltas back into the buffer, combining with anything recorded since
    pub fn restore(&self, deltas: impl IntoIterator<Item = SummaryUpdate>) {
        let mut pending = self.pending.lock();
        for delta in deltas {
            pending
                .entry((delta.row_key, delta.qualifier))
                .or_default()
                .combine(&delta.summary);
        }
    }

    /// Write buffered deltas on top of the stored summaries.
    ///
    /// Returns the combined report of every batch. On `Err` the deltas not yet
    /// written are back in the buffer.
    pub fn flush(&self, store: &SummaryStore, writer: &SummaryBatchWriter) -> Result<BatchReport> {
        let deltas = self.drain();
        if deltas.is_empty() {
            return Ok(BatchReport::default());
        }
        debug!(cells = deltas.len(), "flushing minute summaries");

        let mut report = BatchReport::default();
        let mut remaining = deltas.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<SummaryUpdate> = remaining.by_ref().take(self.max_batch_size).collect();
            match self.flush_chunk(store, writer, &chunk) {
                Ok(chunk_report) => {
                    let failed = chunk_report.failed();
                    if !failed.is_empty() {
                        warn!(failed = failed.len(), "re-queueing minute summaries that failed to persist");
                        self.restore(failed.iter().map(|f| chunk[f.index].clone()));
                    }
                    report.extend(chunk_report);
                }
                Err(e) => {
                    self.restore(chunk.into_iter().chain(remaining));
                    return Err(e);
                }
            }
        }
        Ok(report)
    }

    fn flush_chunk(
        &self,
        store: &SummaryStore,
        writer: &SummaryBatchWriter,
        chunk: &[SummaryUpdate],
    ) -> Result<BatchReport> {
        let mut totals = Vec::with_capacity(chunk.len());
        for delta in chunk {
            let mut total = store.load_or_default(&delta.row_key, &delta.qualifier)?;
            total.combine(&delta.summary);
            totals.push(SummaryUpdate::new(delta.row_key.clone(), delta.qualifier.clone(), total));
        }
        writer.submit(totals)
    }
}

impl Default for MinuteSummaryAccumulator {
    fn default() -> Self {
        Self::new(crate::summary::SummaryWriterConfig::default().max_batch_size)
    }
}
